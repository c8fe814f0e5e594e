//! # Component abstractions and built-in kinds.
//!
//! This module provides the core component-related types:
//! - [`Component`] - a named or anonymous unit of renderable state
//! - [`Update`] - kind-specific state mutations (replace, set, bounded append)
//! - [`ComponentStatus`] - tri-state lifecycle (`Live` / `Frozen` / `Detached`)
//! - built-in kinds: [`Markdown`], [`Table`], [`ProgressBar`], [`LineChart`], [`Image`]
//! - [`RenderRegistry`] - type tag → render function for custom components
//!
//! A component accepts any number of `update` calls while its owning task
//! runs; rendering is a pure function of the current state.

mod component;
mod kinds;
mod registry;

pub use component::{Component, ComponentStatus, Update};
pub use kinds::{Image, LineChart, Markdown, ProgressBar, Table};
pub use registry::{RenderFn, RenderRegistry};
