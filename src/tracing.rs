//! Wrappers around `tracing` macros that avoid inlining debug machinery into the hot path,
//! as tracing events are typically only enabled for debugging purposes.

macro_rules! trace {
    ($($x:tt)*) => {
        crate::tracing::event!(TRACE, $($x)*)
    };
}

macro_rules! debug {
    ($($x:tt)*) => {
        crate::tracing::event!(DEBUG, $($x)*)
    };
}

macro_rules! info {
    ($($x:tt)*) => {
        crate::tracing::event!(INFO, $($x)*)
    };
}

macro_rules! event {
    ($level:ident, $($x:tt)*) => {{
        if ::tracing::enabled!(::tracing::Level::$level) {
            let event = {
                #[cold] #[inline(never)] || { ::tracing::event!(::tracing::Level::$level, $($x)*) }
            };

            event();
        }
    }};
}

pub(crate) use {debug, event, info, trace};
