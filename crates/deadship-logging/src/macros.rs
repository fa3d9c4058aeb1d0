//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context and macros."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Level-specific macros that stamp every event with a [`crate::LogContext`].

/// Shared expansion for the level-specific macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __sim_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            scenario = ctx.scenario.unwrap_or(""),
            engine_state = ctx.engine_state.unwrap_or(""),
            start_path = ctx.start_path.unwrap_or(""),
            sim_time_ms = ctx.sim_time_ms.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with simulation context.
#[macro_export]
macro_rules! sim_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__sim_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__sim_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with simulation context.
#[macro_export]
macro_rules! sim_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__sim_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__sim_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with simulation context.
#[macro_export]
macro_rules! sim_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__sim_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__sim_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
