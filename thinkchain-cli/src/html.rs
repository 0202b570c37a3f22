//! Server-rendered form page

use minijinja::{context, Environment};
use serde::Serialize;
use thinkchain_agent::ChainOutput;
use thinkchain_gateway::params::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use thinkchain_gateway::Model;

const PAGE_NAME: &str = "page.html";

// A textarea drops one newline right after its start tag, so each one
// starts with a newline to keep leading newlines in the content.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Chain-of-Thought</title></head>
<body>
<h1>Chain-of-Thought (CoT) Interactive Process</h1>
{% if error %}<p class="error">{{ error }}</p>
{% endif %}<form method="post" action="/run">
<label for="api_key">API Key</label>
<input id="api_key" name="api_key" type="password" placeholder="Enter your API key">
<label for="model">Select Model</label>
<select id="model" name="model">
{%- for m in models %}
<option value="{{ m }}"{% if m == model %} selected{% endif %}>{{ m }}</option>
{%- endfor %}
</select>
<label for="top_p">top_p</label>
<input id="top_p" name="top_p" type="number" min="0" max="1" step="0.01" value="{{ top_p }}">
<label for="temperature">temperature</label>
<input id="temperature" name="temperature" type="number" min="0" max="1" step="0.01"
 value="{{ temperature }}">
<label for="max_tokens">max_tokens</label>
<input id="max_tokens" name="max_tokens" type="number" min="1" step="1" value="{{ max_tokens }}">
<label for="question">Question</label>
<textarea id="question" name="question" rows="3" placeholder="Enter a question to analyze.">
{{ question }}</textarea>
<button type="submit">Submit</button>
</form>
{% for s in sections %}<label for="{{ s.id }}">{{ s.label }}</label>
<textarea id="{{ s.id }}" rows="10" readonly>
{{ s.text }}</textarea>
{% endfor %}</body>
</html>
"#;

/// Values shown in the form, plus whatever a submission produced.
#[derive(Debug, Default)]
pub struct PageView<'a> {
    pub model: Model,
    pub top_p: Option<String>,
    pub temperature: Option<String>,
    pub max_tokens: Option<String>,
    pub question: String,
    pub error: Option<String>,
    pub output: Option<&'a ChainOutput>,
}

#[derive(Serialize)]
struct Section<'a> {
    label: &'static str,
    id: &'static str,
    text: &'a str,
}

/// Renders the form page. The `.html` template name turns on auto-escaping.
pub fn render_page(view: &PageView<'_>) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(PAGE_NAME, PAGE_TEMPLATE)?;

    let (analysis, reasoning, verification) = view
        .output
        .map(|o| o.outputs())
        .unwrap_or(("", "", ""));
    let sections = [
        Section { label: "Analysis", id: "analysis", text: analysis },
        Section { label: "Reasoning", id: "reasoning", text: reasoning },
        Section { label: "Verification", id: "verification", text: verification },
    ];

    let models: Vec<&str> = Model::ALL.iter().map(|m| m.as_str()).collect();

    let template = env.get_template(PAGE_NAME)?;
    template.render(context! {
        error => view.error.as_deref(),
        models => models,
        model => view.model.as_str(),
        top_p => view.top_p.clone().unwrap_or_else(|| DEFAULT_TOP_P.to_string()),
        temperature => view
            .temperature
            .clone()
            .unwrap_or_else(|| DEFAULT_TEMPERATURE.to_string()),
        max_tokens => view
            .max_tokens
            .clone()
            .unwrap_or_else(|| DEFAULT_MAX_TOKENS.to_string()),
        question => &view.question,
        sections => sections,
    })
}
