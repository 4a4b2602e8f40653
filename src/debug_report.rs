use datalayer::scenario::StepReport;
use datalayer::{DispatchStats, EventRecord, Outcome};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Fields shown on the headline of each record; the rest go underneath.
const HEADLINE_FIELDS: [&str; 4] = ["event", "element", "action", "timestamp"];

pub fn print_run(started_at: i64, reports: &[StepReport], records: &[EventRecord], stats: &DispatchStats, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Replaying {} step(s)", reports.len()), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Steps ━━━", ansi::GRAY));
    print_steps(started_at, reports, &palette);

    println!("\n{}", palette.paint("━━━ dataLayer ━━━", ansi::GRAY));
    if records.is_empty() {
        println!("{}", palette.dim("  No records emitted"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • Targets are outside the catalog scope");
        println!("  • Dynamic fields vetoed the match (valid field on blur, unchecked consent)");
        println!("  • focusin/input timers have not fired yet (add a `wait`)");
        println!("\n{}", palette.dim("  Tip: Set RUST_LOG=datalayer=debug to see resolution details"));
    } else {
        print_records(records, &palette);
    }

    println!("\n{}", palette.paint("━━━ Stats ━━━", ansi::GRAY));
    println!(
        "  Events: {}  │  Matches: {}  │  Emitted: {}  │  Dropped: {}",
        palette.paint(stats.events.to_string(), ansi::BLUE),
        palette.paint(stats.matches.to_string(), ansi::CYAN),
        palette.paint(stats.emitted.to_string(), ansi::GREEN),
        palette.dim(stats.dropped().to_string()),
    );
    println!(
        "  {}",
        palette.dim(format!(
            "no match: {}  vetoed: {}  incomplete: {}  debounced: {}  refocus suppressed: {}",
            stats.no_matches, stats.vetoes, stats.incomplete, stats.debounced, stats.suppressed_refocus
        ))
    );
    println!();
}

fn print_steps(started_at: i64, reports: &[StepReport], palette: &ansi::Palette) {
    for report in reports {
        println!(
            "  {} {}",
            palette.paint(format!("+{:>6}ms", report.at_ms - started_at), ansi::GRAY),
            palette.paint(report.step.to_string(), ansi::BLUE)
        );
        for outcome in &report.outcomes {
            println!("      {}", fmt_outcome(outcome, palette));
        }
    }
}

fn fmt_outcome(outcome: &Outcome, palette: &ansi::Palette) -> String {
    match outcome {
        Outcome::Emitted { .. } => palette.paint(format!("✓ {outcome}"), ansi::GREEN),
        Outcome::Vetoed { .. } | Outcome::Incomplete { .. } => palette.paint(format!("✗ {outcome}"), ansi::RED),
        Outcome::SuppressedRefocus => palette.paint(format!("✗ {outcome}"), ansi::YELLOW),
        _ => palette.dim(format!("· {outcome}")),
    }
}

fn print_records(records: &[EventRecord], palette: &ansi::Palette) {
    for (idx, record) in records.iter().enumerate() {
        println!(
            "  {} {} {} {}",
            palette.paint(format!("[{idx}]"), ansi::GRAY),
            palette.bold(palette.paint(record.event(), ansi::GREEN)),
            palette.dim("│"),
            palette.paint(
                format!("{}:{}", record.get("element").unwrap_or("-"), record.get("action").unwrap_or("-")),
                ansi::YELLOW
            ),
        );
        println!("      {} {}", palette.dim("at:"), palette.paint(record.timestamp(), ansi::CYAN));
        for (key, value) in record.fields().iter().filter(|(key, _)| !HEADLINE_FIELDS.contains(&key.as_str())) {
            println!("      {} {:?}", palette.dim(format!("{key}:")), value);
        }
    }
}
