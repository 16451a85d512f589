//! One frame of a wall as a list of scopes and draws, rendered as text or
//! JSON.

use std::fmt::Write as _;

use compositor::{DrawRecord, RecordedEvent, RecordingBackend, RecordingScope};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePlan {
    pub scopes: Vec<ScopePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopePlan {
    /// `headless`, or the label of the presented surface.
    pub scope: String,
    pub draws: Vec<DrawPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawPlan {
    pub pass: String,
    pub material: String,
    pub target: String,
    pub samplers: Vec<SamplerPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerPlan {
    pub name: String,
    pub texture: String,
}

impl FramePlan {
    /// Groups the recorded events of one frame by scope, naming resources by
    /// their labels.
    pub fn from_events(backend: &RecordingBackend, events: &[RecordedEvent]) -> Self {
        let mut scopes: Vec<ScopePlan> = Vec::new();
        for event in events {
            match event {
                RecordedEvent::Begin(scope) => scopes.push(ScopePlan {
                    scope: scope_label(backend, scope),
                    draws: Vec::new(),
                }),
                RecordedEvent::Draw(draw) => {
                    if let Some(scope) = scopes.last_mut() {
                        scope.draws.push(describe_draw(backend, draw));
                    }
                }
                RecordedEvent::End => {}
            }
        }
        Self { scopes }
    }

    pub fn draw_count(&self) -> usize {
        self.scopes.iter().map(|scope| scope.draws.len()).sum()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for scope in &self.scopes {
            let _ = writeln!(out, "{}:", scope.scope);
            for (index, draw) in scope.draws.iter().enumerate() {
                let samplers = draw
                    .samplers
                    .iter()
                    .map(|sampler| format!("{}={}", sampler.name, sampler.texture))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(
                    out,
                    "  {index:>2}. {:<11} -> {:<20} material={} samplers=[{samplers}]",
                    draw.pass, draw.target, draw.material
                );
            }
        }
        out
    }
}

fn scope_label(backend: &RecordingBackend, scope: &RecordingScope) -> String {
    match scope {
        RecordingScope::Headless => "headless".to_string(),
        RecordingScope::Surface(target) => backend
            .target_label(target.id)
            .map(|label| format!("surface '{label}'"))
            .unwrap_or_else(|| format!("surface {:?}", target.id)),
    }
}

fn describe_draw(backend: &RecordingBackend, draw: &DrawRecord) -> DrawPlan {
    DrawPlan {
        pass: draw.pass.label().to_string(),
        material: draw.material.clone(),
        target: backend
            .target_label(draw.target)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", draw.target)),
        samplers: draw
            .samplers
            .iter()
            .map(|(name, texture)| SamplerPlan {
                name: name.to_string(),
                texture: backend
                    .texture_label(*texture)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{texture:?}")),
            })
            .collect(),
    }
}
