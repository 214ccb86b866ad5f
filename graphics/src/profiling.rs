//! Profiling support via Tracy.
//!
//! Instrumentation is compiled in with the `profiling` Cargo feature:
//!
//! ```bash
//! cargo run -p ember-demos --features ember-graphics/profiling
//! ```
//!
//! Call [`start`] once at startup, then connect Tracy to the running
//! process. Spans recorded while no client is running are skipped.
//!
//! ```ignore
//! use ember_graphics::{profile_function, profile_scope};
//!
//! fn upload() {
//!     profile_function!();
//!     {
//!         profile_scope!("copy_rows");
//!         // ...
//!     }
//! }
//! ```
//!
//! When profiling is disabled (the default) every macro expands to nothing.

#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, plot as tracy_plot, span};

/// Start the Tracy client. Does nothing without the `profiling` feature.
pub fn start() {
    #[cfg(feature = "profiling")]
    {
        Client::start();
        log::info!("Tracy profiling client started");
    }
}

/// Mark the end of a frame.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        if let Some(client) = $crate::profiling::Client::running() {
            client.frame_mark();
        }
    };
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

/// Profile the rest of the enclosing scope under `$name`.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span =
            $crate::profiling::Client::running().map(|_| $crate::profiling::span!($name));
    };
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Profile the rest of the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span =
            $crate::profiling::Client::running().map(|_| $crate::profiling::span!());
    };
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Plot a numeric value over time.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        if $crate::profiling::Client::running().is_some() {
            $crate::profiling::tracy_plot!($name, $value as f64)
        }
    };
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

/// Name the current thread in the profiler.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! set_thread_name {
    ($name:expr) => {
        if $crate::profiling::Client::running().is_some() {
            $crate::profiling::tracy_client::set_thread_name!($name)
        }
    };
}

#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! set_thread_name {
    ($name:expr) => {};
}
