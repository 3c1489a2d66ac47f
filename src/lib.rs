/*
 * MarkScout core: the search coordination, live file-change detection, and
 * marker projection subsystem of a markdown workspace browser. The
 * surrounding application (document rendering, tabs, window chrome) consumes
 * this crate through `app_logic::SearchPanelLogic` and the
 * `core::SearchEventSink` notification surface.
 */
pub mod app_logic;
pub mod core;

use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/*
 * Initializes the process-wide logger. Idempotent, so tests and the host
 * application can call it freely; the first caller wins. Falls back to the
 * plain logger when no terminal is attached.
 */
pub fn initialize_logging() {
    LOGGING_INIT.call_once(|| {
        let config = simplelog::Config::default();
        if simplelog::TermLogger::init(
            log::LevelFilter::Debug,
            config.clone(),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
        .is_err()
        {
            let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, config);
        }
    });
}
