use std::sync::OnceLock;

use flexi_logger::{DeferredNow, LevelFilter, LogSpecification, Logger, Record, style};

const COLOR_VAR: &str = "COLOR";
const LOG_SPEC_VAR: &str = "I3_WORKSPACES_LOG";

const PROC_NAME: &str = "I3-WORKSPACES";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static COLOR: OnceLock<bool> = OnceLock::new();

fn should_color() -> bool {
    COLOR.get().is_some_and(|it| *it)
}

/// `None` means the choice is left to whether stderr is a terminal.
fn parse_color(value: Option<&str>) -> Option<bool> {
    match value? {
        "never" | "no" | "off" | "false" => Some(false),
        "always" | "yes" | "on" | "true" => Some(true),
        _ => None,
    }
}

fn log_spec(value: Option<&str>) -> LogSpecification {
    let default = || -> LogSpecification {
        if cfg!(debug_assertions) {
            LevelFilter::Debug.into()
        } else {
            LevelFilter::Info.into()
        }
    };
    let Some(value) = value else {
        return default();
    };
    LogSpecification::parse(value).unwrap_or_else(|err| {
        eprintln!("Invalid {LOG_SPEC_VAR}={value:?}: {err}");
        default()
    })
}

fn format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> std::io::Result<()> {
    let level = record.level();
    let file = record.file().unwrap_or("<unknown>");
    let line = record.line().map_or_else(|| "?".to_owned(), |it| it.to_string());
    let now = now.format(TIME_FORMAT);
    let args = record.args();

    if should_color() {
        let level = style(level).paint(level.to_string());
        write!(w, "[\x1b[35m{now}\x1b[0m] {PROC_NAME} {level} [{file}:{line}] {args}")
    } else {
        write!(w, "[{now}] {PROC_NAME} {level} [{file}:{line}] {args}")
    }
}

pub fn init_logger() {
    let color = parse_color(std::env::var(COLOR_VAR).ok().as_deref())
        .unwrap_or_else(|| std::io::IsTerminal::is_terminal(&std::io::stderr()));
    _ = COLOR.set(color);

    let spec = log_spec(std::env::var(LOG_SPEC_VAR).ok().as_deref());
    match Logger::with(spec).format(format).log_to_stderr().start() {
        // The handle flushes and shuts the logger down on drop
        Ok(handle) => std::mem::forget(handle),
        Err(err) => {
            eprintln!("Failed to start logger: {err}.");
            return;
        }
    }

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("{info}");
        hook(info);
    }));
    log::debug!("Started logger");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_setting() {
        assert_eq!(parse_color(Some("always")), Some(true));
        assert_eq!(parse_color(Some("off")), Some(false));
        assert_eq!(parse_color(Some("auto")), None);
        assert_eq!(parse_color(None), None);
    }

    #[test]
    fn log_spec_override() {
        let spec = log_spec(Some("warn, i3_workspaces::mirror = trace"));
        assert_eq!(spec.module_filters().len(), 2);

        let fallback = log_spec(Some("not a [valid] spec ="));
        assert_eq!(fallback.module_filters(), log_spec(None).module_filters());
    }
}
