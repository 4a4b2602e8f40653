use crate::{Document, NodeId};

const PAGE_URL: &str = "https://www.example.com/contact/demo";
const PRIVACY_URL: &str = "https://www.example.com/privacy-policy";

fn form_group(doc: &mut Document, form: NodeId, label: &str) -> NodeId {
    let group = doc.append_element(form, "div", &[("class", "form-group")]);
    let text = doc.append_element(group, "label", &[("class", "elqLabel")]);
    doc.append_text(text, label);
    group
}

/// ```text
/// body
///  ├─ div#form-container
///  │   └─ form#form224
///  │       ├─ .form-group  "First Name"     input.elqField#firstName (required)
///  │       ├─ .form-group  "Email Address"  input.elqField#emailAddress[type=email] (required), .require-block
///  │       ├─ .form-group  "Company"        input#company
///  │       ├─ .form-group  "Country"        select#countryone (required), .require-block
///  │       ├─ .form-group                   input#consentcheckbox (required), privacy link
///  │       └─ button#submit "Send"
///  └─ footer
///      ├─ a[href=..privacy-policy] "Privacy"
///      ├─ a[href=/imprint] "Imprint"
///      └─ input.elqField#newsletter
/// ```
///
/// The page lives at `https://www.example.com/contact/demo`.
pub(super) fn document() -> Document {
    let mut doc = Document::new();
    if let Err(err) = doc.set_url(PAGE_URL) {
        log::warn!("demo page URL rejected: {err}");
    }
    let root = doc.root();
    let body = doc.append_element(root, "body", &[]);

    let container = doc.append_element(body, "div", &[("id", "form-container")]);
    let form = doc.append_element(container, "form", &[("id", "form224"), ("name", "DemoContactRequest")]);

    let group = form_group(&mut doc, form, "First Name");
    doc.append_element(
        group,
        "input",
        &[("id", "firstName"), ("class", "elqField"), ("type", "text"), ("name", "firstName"), ("required", "")],
    );

    let group = form_group(&mut doc, form, "Email Address");
    doc.append_element(
        group,
        "input",
        &[("id", "emailAddress"), ("class", "elqField"), ("type", "email"), ("name", "emailAddress"), ("required", "")],
    );
    let hint = doc.append_element(group, "span", &[("class", "require-block")]);
    doc.append_text(hint, " Please enter a valid email address ");

    let group = form_group(&mut doc, form, "Company");
    doc.append_element(group, "input", &[("id", "company"), ("type", "text"), ("name", "company")]);

    let group = form_group(&mut doc, form, "Country");
    let select = doc.append_element(group, "select", &[("id", "countryone"), ("name", "country"), ("required", "")]);
    for (value, text) in [("", "-- Please Select --"), ("DE", " Germany "), ("FR", "France"), ("US", "United States")] {
        let option = doc.append_element(select, "option", &[("value", value)]);
        doc.append_text(option, text);
    }
    let hint = doc.append_element(group, "span", &[("class", "require-block")]);
    doc.append_text(hint, "Please select a country");

    let group = doc.append_element(form, "div", &[("class", "form-group consent")]);
    doc.append_element(group, "input", &[("id", "consentcheckbox"), ("type", "checkbox"), ("required", "")]);
    let label = doc.append_element(group, "label", &[("for", "consentcheckbox")]);
    doc.append_text(label, "I agree to the processing of my data. See our ");
    let link = doc.append_element(label, "a", &[("href", PRIVACY_URL)]);
    doc.append_text(link, " Privacy Policy ");

    let button = doc.append_element(form, "button", &[("id", "submit"), ("type", "submit")]);
    doc.append_text(button, "\n  Send\n");

    let footer = doc.append_element(body, "footer", &[]);
    let link = doc.append_element(footer, "a", &[("href", PRIVACY_URL)]);
    doc.append_text(link, "Privacy");
    let link = doc.append_element(footer, "a", &[("href", "/imprint")]);
    doc.append_text(link, "Imprint");
    doc.append_element(footer, "input", &[("id", "newsletter"), ("class", "elqField"), ("type", "email")]);

    doc
}
