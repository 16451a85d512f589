use crate::types::PassKind;

/// Failure to build a shading pass from its material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PassError {
    #[error("{pass} pass: material '{material}' is not available")]
    MissingMaterial { pass: PassKind, material: String },
    #[error("{pass} pass: unable to find uniform block '{block}' in material '{material}'")]
    MissingUniformBlock {
        pass: PassKind,
        material: String,
        block: String,
    },
    #[error(
        "{pass} pass: unable to find uniform '{uniform}' in block '{block}' of material '{material}'"
    )]
    MissingUniform {
        pass: PassKind,
        material: String,
        block: String,
        uniform: String,
    },
    #[error("{pass} pass: unable to find sampler '{sampler}' in material '{material}'")]
    MissingSampler {
        pass: PassKind,
        material: String,
        sampler: String,
    },
    #[error("{pass} pass: sampler '{sampler}' of material '{material}' has no texture bound")]
    UnboundSampler {
        pass: PassKind,
        material: String,
        sampler: String,
    },
}

impl PassError {
    pub fn pass(&self) -> PassKind {
        match self {
            PassError::MissingMaterial { pass, .. }
            | PassError::MissingUniformBlock { pass, .. }
            | PassError::MissingUniform { pass, .. }
            | PassError::MissingSampler { pass, .. }
            | PassError::UnboundSampler { pass, .. } => *pass,
        }
    }
}

/// Failure to initialise a canvas; the canvas is never drawn.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas '{canvas}': {source}")]
    Pass {
        canvas: String,
        #[source]
        source: PassError,
    },
    #[error("canvas '{canvas}': failed to create {what}")]
    Resource {
        canvas: String,
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl CanvasError {
    pub fn pass(canvas: &str, source: PassError) -> Self {
        CanvasError::Pass {
            canvas: canvas.to_string(),
            source,
        }
    }

    pub fn resource(canvas: &str, what: &'static str, source: anyhow::Error) -> Self {
        CanvasError::Resource {
            canvas: canvas.to_string(),
            what,
            source,
        }
    }
}
