//! Frame stack for loops.
//!
//! Every value produced under control flow is keyed by the id of the frame
//! stack it was produced in. The root context has the empty id; a nested
//! frame appends `/<frame name>-<iteration>`.
use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub id: usize,
    pub frame_name: String,
    pub iteration: usize,
}

impl FrameInfo {
    fn root() -> Self {
        Self {
            id: 0,
            frame_name: String::new(),
            iteration: 0,
        }
    }

    fn key(&self) -> String {
        if self.id == 0 && self.iteration == 0 {
            String::new()
        } else {
            format!("{}-{}", self.frame_name, self.iteration)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    frames: Vec<FrameInfo>,
    last_id: usize,
    /// Ids of the current frame and each ancestor, innermost first.
    context_ids: Vec<String>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        let mut context = Self {
            frames: vec![FrameInfo::root()],
            last_id: 0,
            context_ids: Vec::new(),
        };
        context.refresh_ids();
        context
    }

    /// Context positioned at a frame stack captured with `frames`.
    pub fn from_frames(frames: Vec<FrameInfo>) -> Self {
        let mut context = Self::new();
        context.set_frames(frames);
        context
    }

    fn refresh_ids(&mut self) {
        let mut ids = Vec::with_capacity(self.frames.len());
        for depth in (1..=self.frames.len()).rev() {
            let id = self.frames[..depth]
                .iter()
                .map(FrameInfo::key)
                .collect::<Vec<_>>()
                .join("/");
            ids.push(id);
        }
        self.context_ids = ids;
    }

    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    /// Restore a frame stack captured with `frames`.
    pub fn set_frames(&mut self, frames: Vec<FrameInfo>) {
        self.frames = frames;
        self.refresh_ids();
    }

    pub fn current_id(&self) -> &str {
        &self.context_ids[0]
    }

    pub fn context_ids(&self) -> &[String] {
        &self.context_ids
    }

    pub fn enter_frame(&mut self, frame_name: &str) {
        self.last_id += 1;
        self.frames.push(FrameInfo {
            id: self.last_id,
            frame_name: frame_name.to_string(),
            iteration: 0,
        });
        self.refresh_ids();
    }

    pub fn exit_frame(&mut self) -> Result<()> {
        if self.frames.len() <= 1 {
            return Err(anyhow!("cannot exit a frame from the root context"));
        }
        self.frames.pop();
        self.refresh_ids();
        Ok(())
    }

    pub fn next_iteration(&mut self) -> Result<()> {
        if self.frames.len() <= 1 {
            return Err(anyhow!("cannot advance an iteration in the root context"));
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.iteration += 1;
        }
        self.refresh_ids();
        Ok(())
    }
}
