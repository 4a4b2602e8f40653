use crate::{Catalog, DomView, EventSpec, Extraction, Fields, NodeId, Rule, Trigger};

const SCOPE: &str = "#form-container, form#form224";
const TEXT_FIELDS: &str = "input.elqField, input#company";
const COUNTRY: &str = "select#countryone";

/// Placeholder for fields the tag manager expects on every record.
const BLANK: &str = " ";

// --- Field helpers -----------------------------------------------------------

fn form_spec(trigger: Trigger, description: &str, element: &str, action: &str) -> EventSpec {
    EventSpec::new(trigger).fields(fields! {
        "event" => "product",
        "description" => format!("DemoContactRequest form - {description}"),
        "component" => "contact_form",
        "element" => element,
        "action" => action,
    })
}

fn form_group(dom: &dyn DomView, el: NodeId) -> Option<NodeId> {
    dom.closest(el, ".form-group")
}

/// Text of the first `selector` match inside the element's form group.
fn group_text(dom: &dyn DomView, el: NodeId, selector: &str) -> Option<String> {
    let group = form_group(dom, el)?;
    let node = dom.query_selector(group, selector)?;
    dom.text_content(node)
}

fn field_label(dom: &dyn DomView, el: NodeId) -> String {
    group_text(dom, el, ".elqLabel").unwrap_or_default().trim().to_string()
}

fn labelled(dom: &dyn DomView, el: NodeId, action_value: &str) -> Fields {
    fields! {
        "field" => field_label(dom, el),
        "actionValue" => action_value,
        "linkText" => BLANK,
        "linkURL" => BLANK,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn is_valid(dom: &dyn DomView, el: NodeId) -> bool {
    dom.check_validity(el) == Some(true)
}

// --- Catalogs ----------------------------------------------------------------

pub(super) fn catalog() -> Catalog {
    Catalog::builder("form_events")
        .scope(SCOPE)
        .rules(text_field_rules())
        .rules(country_rules())
        .rules(cta_rules())
        .build()
}

fn text_field_rules() -> Vec<Rule> {
    vec![
        rule! {
            key: "textFieldFocus",
            selector: TEXT_FIELDS,
            event: form_spec(Trigger::FocusIn, "Text field - Focus in field", "text_field", "focus")
                .dynamic(|dom, el, _| labelled(dom, el, BLANK).into()),
        },
        // Never carries the typed value.
        rule! {
            key: "textFieldInput",
            selector: TEXT_FIELDS,
            event: form_spec(Trigger::Input, "Text field - Text input in field", "text_field", "input")
                .dynamic(|dom, el, _| labelled(dom, el, BLANK).into()),
        },
        rule! {
            key: "textFieldInvalid",
            selector: TEXT_FIELDS,
            event: form_spec(Trigger::Blur, "Text field - Field error", "text_field", "invalid").dynamic(|dom, el, _| {
                if is_valid(dom, el) {
                    return Extraction::Veto;
                }
                let error = non_empty(group_text(dom, el, ".require-block"))
                    .or_else(|| dom.validation_message(el))
                    .unwrap_or_default();
                labelled(dom, el, error.trim()).into()
            }),
        },
    ]
}

fn country_rules() -> Vec<Rule> {
    vec![
        rule! {
            key: "countryOpen",
            selector: COUNTRY,
            event: form_spec(Trigger::FocusIn, "Dropdown - Open", "dropdown", "open")
                .dynamic(|dom, el, _| labelled(dom, el, BLANK).into()),
        },
        rule! {
            key: "countryClose",
            selector: COUNTRY,
            event: form_spec(Trigger::Blur, "Dropdown - Close", "dropdown", "close")
                .dynamic(|dom, el, _| labelled(dom, el, BLANK).into()),
        },
        rule! {
            key: "countrySelect",
            selector: COUNTRY,
            event: form_spec(Trigger::Change, "Dropdown - Select", "dropdown", "select").dynamic(|dom, el, _| {
                let choice = dom
                    .selected_option_text(el)
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
                    .or_else(|| dom.value(el))
                    .unwrap_or_default();
                labelled(dom, el, &choice).into()
            }),
        },
        // Shadowed by countryClose (same selector and trigger, declared first).
        rule! {
            key: "countryInvalid",
            selector: COUNTRY,
            event: form_spec(Trigger::Blur, "Dropdown - Error", "dropdown", "invalid").dynamic(|dom, el, _| {
                if is_valid(dom, el) {
                    return Extraction::Veto;
                }
                let error = group_text(dom, el, ".require-block").unwrap_or_default();
                labelled(dom, el, error.trim()).into()
            }),
        },
    ]
}

fn consent(description: &str, action: &str, emit_when_checked: bool) -> EventSpec {
    form_spec(Trigger::Change, description, "checkbox", action).field("field", "ConsentText").dynamic(
        move |dom, el, _| {
            if dom.checked(el).unwrap_or(false) != emit_when_checked {
                return Extraction::Veto;
            }
            fields! { "actionValue" => BLANK, "linkText" => BLANK, "linkURL" => BLANK }.into()
        },
    )
}

fn cta_rules() -> Vec<Rule> {
    vec![
        rule! {
            key: "consentCheckbox",
            selector: "#consentcheckbox, #personalconsent",
            events: {
                "on" => consent("Consent text - Checkbox - On", "on", true),
                "off" => consent("Consent text - Checkbox - Off", "off", false),
            },
        },
        rule! {
            key: "ctaClick",
            selector: "#submit",
            event: form_spec(Trigger::Click, "CTA buttton - Click", "cta_button", "click").dynamic(|dom, el, _| {
                let label = non_empty(dom.text_content(el)).or_else(|| dom.value(el)).unwrap_or_default();
                fields! { "actionValue" => label.trim(), "linkText" => BLANK, "linkURL" => BLANK }.into()
            }),
        },
        rule! {
            key: "submitValid",
            selector: "form#form224",
            event: form_spec(Trigger::Submit, "Submit - Valid", "cta_button", "submit").dynamic(|dom, el, _| {
                if dom.check_validity(el) == Some(false) {
                    return Extraction::Veto;
                }
                fields! { "actionValue" => "valid", "linkText" => BLANK, "linkURL" => BLANK }.into()
            }),
        },
        rule! {
            key: "privacyLinkClick",
            selector: r#"a[href*="privacy-policy"]"#,
            event: form_spec(Trigger::Click, "Privacy link - Click", "link", "click")
                .dynamic(|dom, el, _| link(dom, el).into()),
        },
    ]
}

fn link(dom: &dyn DomView, el: NodeId) -> Fields {
    fields! {
        "linkText" => dom.text_content(el).unwrap_or_default().trim(),
        "linkURL" => dom.link_href(el).unwrap_or_default(),
    }
}

/// Footer links and generic form submits anywhere on the page.
pub(super) fn site_links() -> Catalog {
    Catalog::builder("site_links")
        .rule(rule! {
            key: "footerLinkClick",
            selector: "footer a[href]",
            event: EventSpec::new(Trigger::Click)
                .fields(fields! {
                    "event" => "navigation",
                    "component" => "footer",
                    "element" => "link",
                    "action" => "click",
                })
                .dynamic(|dom, el, _| link(dom, el).into()),
        })
        .rule(rule! {
            key: "formSubmit",
            selector: "form",
            event: EventSpec::new(Trigger::Submit)
                .fields(fields! { "event" => "form_submit", "action" => "submit" })
                .dynamic(|dom, el, _| fields! { "formId" => dom.attribute(el, "id").unwrap_or_default() }.into()),
        })
        .build()
}
