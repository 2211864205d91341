//! Static HTML pages, rendered once at router construction.

use crate::inference::domain::Feature;

const HEAD: &str = include_str!("../../templates/layout_head.html");
const TAIL: &str = include_str!("../../templates/layout_tail.html");
const INDEX: &str = include_str!("../../templates/index.html");
const PREDICT: &str = include_str!("../../templates/predict.html");
const ABOUT: &str = include_str!("../../templates/about.html");
const RESULT: &str = include_str!("../../templates/result.html");

#[derive(Clone, Debug)]
pub struct Pages {
    pub index: String,
    pub predict: String,
    pub about: String,
    pub result: String,
}

impl Pages {
    pub fn render() -> Self {
        Self {
            index: wrap(INDEX),
            predict: wrap(&PREDICT.replace("{{fields}}", &form_fields())),
            about: wrap(ABOUT),
            result: wrap(RESULT),
        }
    }
}

fn wrap(body: &str) -> String {
    let mut page = String::with_capacity(HEAD.len() + body.len() + TAIL.len());
    page.push_str(HEAD);
    page.push_str(body);
    page.push_str(TAIL);
    page
}

/// One labelled number input per feature, in canonical order.
fn form_fields() -> String {
    Feature::ALL
        .iter()
        .map(|f| {
            format!(
                "      <div><label for=\"{name}\">{label}</label>\
                 <input type=\"number\" step=\"any\" id=\"{name}\" name=\"{name}\" title=\"{title}\" required></div>\n",
                name = f.name(),
                label = f.label(),
                title = f.description().replace('>', "&gt;").replace('<', "&lt;"),
            )
        })
        .collect()
}
