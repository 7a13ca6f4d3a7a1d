//! Macros for building step lists.
//!
//! - `steps!`: a list of synchronous steps for [`SyncChain`](crate::SyncChain)
//! - `async_steps!`: a list of asynchronous steps for [`Chain`](crate::Chain)

/// Build the list of steps run by a synchronous chain.
///
/// Each expression must implement [`Step`](crate::Step). Steps keep their
/// order; the first one gets index `#0` in error messages.
#[macro_export]
macro_rules! steps {
    ($($step:expr),* $(,)?) => {
        ::std::vec![
            $(
                ::std::boxed::Box::new($step) as $crate::BoxedStep
            ),*
        ]
    };
}

/// Build the list of steps run by an asynchronous chain.
///
/// Each expression must implement [`AsyncStep`](crate::AsyncStep).
#[macro_export]
macro_rules! async_steps {
    ($($step:expr),* $(,)?) => {
        ::std::vec![
            $(
                ::std::boxed::Box::new($step) as $crate::BoxedAsyncStep
            ),*
        ]
    };
}
