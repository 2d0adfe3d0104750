//! Rendering for automation message templates with `{{variable}}`
//! placeholders. Rendering is total: unset or unknown variables become the
//! empty string, never an error - a half-rendered follow-up beats a dropped
//! one.

use tera::{Context, Tera};

pub const VAR_NAME: &str = "name";
pub const VAR_BUSINESS_TYPE: &str = "businessType";
pub const VAR_AGENT_NAME: &str = "agentName";

/// Variables available to automation templates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub name: String,
    pub business_type: String,
    pub agent_name: String,
}

impl TemplateVars {
    pub fn new(
        name: impl Into<String>,
        business_type: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            business_type: business_type.into(),
            agent_name: agent_name.into(),
        }
    }
}

/// Render `template`, substituting the supported placeholders. Tera handles
/// the well-formed case; templates it rejects (unknown variables, stray
/// braces) go through a literal substitution pass instead so rendering never
/// fails.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut context = Context::new();
    context.insert(VAR_NAME, &vars.name);
    context.insert(VAR_BUSINESS_TYPE, &vars.business_type);
    context.insert(VAR_AGENT_NAME, &vars.agent_name);

    match Tera::one_off(template, &context, false) {
        Ok(rendered) => rendered,
        Err(_) => substitute_literal(template, vars),
    }
}

fn substitute_literal(template: &str, vars: &TemplateVars) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        match after_open.find("}}") {
            Some(close) => {
                let token = after_open[..close].trim();
                output.push_str(match token {
                    VAR_NAME => &vars.name,
                    VAR_BUSINESS_TYPE => &vars.business_type,
                    VAR_AGENT_NAME => &vars.agent_name,
                    _ => "",
                });
                rest = &after_open[close + 2..];
            }
            None => {
                // Unterminated placeholder: keep the raw tail.
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::{render, substitute_literal, TemplateVars};

    fn vars() -> TemplateVars {
        TemplateVars::new("Dana", "roofing", "Riley")
    }

    #[test]
    fn substitutes_all_supported_placeholders() {
        let rendered = render(
            "Hi {{name}}, thanks for asking about our {{businessType}} services! - {{agentName}}",
            &vars(),
        );
        assert_eq!(rendered, "Hi Dana, thanks for asking about our roofing services! - Riley");
    }

    #[test]
    fn unset_variables_render_empty() {
        let rendered = render("Hi {{name}}, welcome!", &TemplateVars::default());
        assert_eq!(rendered, "Hi , welcome!");
    }

    #[test]
    fn unknown_variables_render_empty_instead_of_failing() {
        let rendered = render("Hi {{name}}, your code is {{promoCode}}.", &vars());
        assert_eq!(rendered, "Hi Dana, your code is .");
    }

    #[test]
    fn templates_without_placeholders_pass_through() {
        let template = "Just checking in - still interested?";
        assert_eq!(render(template, &vars()), template);
    }

    #[test]
    fn unterminated_placeholder_is_preserved_verbatim() {
        assert_eq!(substitute_literal("Hi {{name", &vars()), "Hi {{name");
    }

    #[test]
    fn literal_pass_handles_padded_tokens() {
        assert_eq!(substitute_literal("Hi {{ name }}!", &vars()), "Hi Dana!");
    }
}
