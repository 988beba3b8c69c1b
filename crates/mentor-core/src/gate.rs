pub const DEFAULT_THRESHOLD: f32 = 0.815;

/// Decides whether a query is within the curriculum from its best
/// retrieval similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurriculumGate {
    threshold: f32,
}

impl Default for CurriculumGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl CurriculumGate {
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Boundary value is in scope. NaN scores never pass.
    pub fn admits(&self, top_score: f32) -> bool {
        top_score >= self.threshold
    }
}
