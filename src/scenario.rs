//! Scripted interaction scenarios.
//!
//! A scenario is a plain-text list of steps replayed against a [`Page`], one
//! step per line. Blank lines and lines starting with `#` are ignored:
//!
//! ```text
//! focus #firstName
//! type #firstName "Jane"
//! wait 600ms
//! select #countryone 1
//! check #consentcheckbox
//! window-blur
//! wait 2s
//! window-focus
//! click #submit
//! submit form#form224
//! ```
//!
//! Selectors run to the end of the line (or up to the quoted text / index for
//! `type` and `select`), so they may contain spaces.

use crate::{Error, Outcome, Page, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Click(String),
    Focus(String),
    Blur,
    Type { selector: String, text: String },
    Check(String),
    Uncheck(String),
    Select { selector: String, index: usize },
    Submit(String),
    WindowBlur,
    WindowFocus,
    Wait(i64),
}

impl Step {
    /// Play this step on `page`.
    pub fn apply(&self, page: &mut Page) -> Result<Vec<Outcome>> {
        match self {
            Step::Click(selector) => page.click(selector),
            Step::Focus(selector) => page.focus(selector),
            Step::Blur => Ok(page.blur()),
            Step::Type { selector, text } => page.type_text(selector, text),
            Step::Check(selector) => page.check(selector),
            Step::Uncheck(selector) => page.uncheck(selector),
            Step::Select { selector, index } => page.select_option(selector, *index),
            Step::Submit(selector) => page.submit(selector),
            Step::WindowBlur => Ok(page.window_blur()),
            Step::WindowFocus => Ok(page.window_focus()),
            Step::Wait(ms) => Ok(page.advance_time(*ms)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Click(selector) => write!(f, "click {selector}"),
            Step::Focus(selector) => write!(f, "focus {selector}"),
            Step::Blur => f.write_str("blur"),
            Step::Type { selector, text } => write!(f, "type {selector} {text:?}"),
            Step::Check(selector) => write!(f, "check {selector}"),
            Step::Uncheck(selector) => write!(f, "uncheck {selector}"),
            Step::Select { selector, index } => write!(f, "select {selector} {index}"),
            Step::Submit(selector) => write!(f, "submit {selector}"),
            Step::WindowBlur => f.write_str("window-blur"),
            Step::WindowFocus => f.write_str("window-focus"),
            Step::Wait(ms) => write!(f, "wait {ms}ms"),
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, String> {
        let caps = regex!(r"^([a-z-]+)(?:\s+(.*))?$").captures(line.trim()).ok_or("expected `<command> [args]`")?;
        let command = &caps[1];
        let args = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");

        let selector = || {
            if args.is_empty() { Err(format!("`{command}` expects a selector")) } else { Ok(args.to_string()) }
        };
        let no_args = |step: Step| {
            if args.is_empty() { Ok(step) } else { Err(format!("`{command}` takes no arguments")) }
        };

        match command {
            "click" => selector().map(Step::Click),
            "focus" => selector().map(Step::Focus),
            "check" => selector().map(Step::Check),
            "uncheck" => selector().map(Step::Uncheck),
            "submit" => selector().map(Step::Submit),
            "blur" => no_args(Step::Blur),
            "window-blur" => no_args(Step::WindowBlur),
            "window-focus" => no_args(Step::WindowFocus),
            "type" => {
                let caps = regex!(r#"^(.+?)\s+"((?:[^"\\]|\\.)*)"$"#)
                    .captures(args)
                    .ok_or("`type` expects `<selector> \"text\"`")?;
                let text = caps[2].replace("\\\"", "\"").replace("\\\\", "\\");
                Ok(Step::Type { selector: caps[1].to_string(), text })
            }
            "select" => {
                let caps = regex!(r"^(.+?)\s+(\d+)$").captures(args).ok_or("`select` expects `<selector> <index>`")?;
                let index = caps[2].parse().map_err(|_| format!("option index `{}` is too large", &caps[2]))?;
                Ok(Step::Select { selector: caps[1].to_string(), index })
            }
            "wait" => parse_duration_ms(args).map(Step::Wait),
            other => Err(format!("unknown step `{other}`")),
        }
    }
}

/// Longest single `wait`: one year.
const MAX_WAIT_MS: i64 = 365 * 24 * 60 * 60 * 1_000;

/// `500`, `500ms` or `2s`, at most [`MAX_WAIT_MS`].
fn parse_duration_ms(value: &str) -> std::result::Result<i64, String> {
    let caps = regex!(r"^(\d+)\s*(ms|s)?$").captures(value).ok_or_else(|| format!("invalid duration `{value}`"))?;
    let too_large = || format!("duration `{value}` is too large (max {MAX_WAIT_MS} ms)");
    let amount: i64 = caps[1].parse().map_err(|_| too_large())?;
    let ms = match caps.get(2).map(|m| m.as_str()) {
        Some("s") => amount.checked_mul(1_000).ok_or_else(too_large)?,
        _ => amount,
    };
    if ms > MAX_WAIT_MS {
        return Err(too_large());
    }
    Ok(ms)
}

/// Parse a whole script. Errors carry the 1-based line number.
pub fn parse(script: &str) -> Result<Vec<Step>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|(idx, line)| line.parse().map_err(|message| Error::Scenario { line: idx + 1, message }))
        .collect()
}

/// One replayed step and what the dispatcher made of it.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: Step,
    /// Page clock (epoch ms) after the step.
    pub at_ms: i64,
    pub outcomes: Vec<Outcome>,
}

/// Replay `steps` in order, stopping at the first failing step.
pub fn run(page: &mut Page, steps: &[Step]) -> Result<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(steps.len());
    for step in steps {
        log::debug!("[scenario] {step}");
        let outcomes = step.apply(page)?;
        reports.push(StepReport { step: step.clone(), at_ms: page.now_ms(), outcomes });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataLayer, Dispatcher, catalogs};

    #[test]
    fn parses_every_command() {
        let script = r#"
            # comment
            focus #firstName
            type #firstName "Jane \"JD\" Doe"
            wait 600ms
            select #countryone 2
            check #consentcheckbox
            uncheck #consentcheckbox
            window-blur
            wait 2s
            window-focus
            blur
            click footer a
            submit form#form224
        "#;
        let steps = parse(script).unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Focus("#firstName".into()),
                Step::Type { selector: "#firstName".into(), text: "Jane \"JD\" Doe".into() },
                Step::Wait(600),
                Step::Select { selector: "#countryone".into(), index: 2 },
                Step::Check("#consentcheckbox".into()),
                Step::Uncheck("#consentcheckbox".into()),
                Step::WindowBlur,
                Step::Wait(2_000),
                Step::WindowFocus,
                Step::Blur,
                Step::Click("footer a".into()),
                Step::Submit("form#form224".into()),
            ]
        );
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse("click #a\n\nhover #b").unwrap_err();
        assert!(matches!(err, Error::Scenario { line: 3, ref message } if message.contains("hover")));

        assert!(matches!(parse("click"), Err(Error::Scenario { line: 1, .. })));
        assert!(matches!(parse("blur #x"), Err(Error::Scenario { line: 1, .. })));
        assert!(matches!(parse("type #x Jane"), Err(Error::Scenario { line: 1, .. })));
        assert!(matches!(parse("wait soon"), Err(Error::Scenario { line: 1, .. })));
    }

    #[test]
    fn oversized_waits_are_rejected() {
        for script in ["wait 9223372036854775807", "wait 9000000000000s", "wait 99999999999999999999"] {
            let err = parse(script).unwrap_err();
            let too_large = matches!(err, Error::Scenario { line: 1, ref message } if message.contains("too large"));
            assert!(too_large, "{script}: {err}");
        }
        assert_eq!(parse(&format!("wait {MAX_WAIT_MS}")).unwrap(), vec![Step::Wait(MAX_WAIT_MS)]);
    }

    #[test]
    fn longest_wait_replays_without_overflow() {
        let mut page = Page::new(catalogs::form_page());
        page.install(Dispatcher::new(catalogs::all(), DataLayer::new()).with_clock(page.clock()));
        let start = page.now_ms();

        let steps = parse("focus #firstName\nwait 31536000s\nwait 31536000s").unwrap();
        let reports = run(&mut page, &steps).unwrap();
        assert!(reports[1].outcomes[0].is_emitted());
        assert_eq!(page.now_ms(), start + 2 * MAX_WAIT_MS);
    }

    #[test]
    fn display_round_trips() {
        let step = Step::Type { selector: "#a".into(), text: "say \"hi\"".into() };
        assert_eq!(step.to_string().parse::<Step>().unwrap(), step);
    }

    #[test]
    fn replays_against_a_page() {
        let sink = DataLayer::new();
        let mut page = Page::new(catalogs::form_page());
        page.install(Dispatcher::new(catalogs::all(), sink.clone()).with_clock(page.clock()));

        let steps = parse("focus #firstName\nwait 100\nclick #submit").unwrap();
        let reports = run(&mut page, &steps).unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].outcomes.len(), 1);
        assert!(reports[2].outcomes[0].is_emitted());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn missing_nodes_stop_the_replay() {
        let mut page = Page::new(catalogs::form_page());
        let steps = parse("click #nope").unwrap();
        assert!(matches!(run(&mut page, &steps), Err(Error::NodeNotFound(_))));
    }
}
