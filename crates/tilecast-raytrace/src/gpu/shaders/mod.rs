//! WGSL shader sources.

/// Compute shader tracing one primary ray per invocation.
pub const RAYTRACE_SHADER: &str = include_str!("raytrace.wgsl");
