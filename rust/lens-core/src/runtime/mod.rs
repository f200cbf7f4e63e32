//! Execution-side helpers a host runtime wires around its tasks and hooks.

pub mod interceptor;

pub use interceptor::{
    FnBody, Interceptor, Invocation, Next, Pipeline, RunRecorder, TaskBody, body_fn,
};
