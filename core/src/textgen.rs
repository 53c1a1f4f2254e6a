//! Text-generation collaborator boundary.
//!
//! The core never depends on what the text says, only that a string
//! comes back. Generation calls are treated as potentially slow and
//! fallible: both failure kinds are retried a bounded number of times
//! and exhaustion aborts the enclosing iteration before anything is
//! committed.
//!
//! The in-tree `TemplateGenerator` is deterministic: it draws from
//! varied template sets using its own RNG stream. Fake templates are
//! deliberately short, generic, and exclamatory — the detectability
//! signature the skeptical persona keys on — while genuine templates
//! name concrete product attributes.

use crate::catalog::ProductSpec;
use crate::error::{SimError, SimResult};
use crate::reviewer::Personality;
use crate::rng::SubsystemRng;
use crate::shopper::{Decision, Persona};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    GenuineReview,
    FakeReview,
    ShopperRationale,
}

/// Context handed to the generator. Fields are populated per kind;
/// the generator ignores what it does not need.
pub struct GenContext<'a> {
    pub product: &'a ProductSpec,
    pub personality: Option<Personality>,
    pub persona: Option<Persona>,
    pub decision: Option<Decision>,
    pub fake_fraction: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,
    #[error("generation failed: {0}")]
    Failed(String),
}

pub trait TextGenerator {
    fn generate(
        &mut self,
        kind: PromptKind,
        ctx: &GenContext<'_>,
        temperature: f64,
    ) -> Result<String, GenerationError>;
}

/// Retry wrapper: both error kinds are retryable. Exhausting the
/// budget becomes a `SimError::Generation`, which the engine treats
/// as an iteration-aborting failure.
pub fn generate_with_retry(
    textgen: &mut dyn TextGenerator,
    kind: PromptKind,
    ctx: &GenContext<'_>,
    temperature: f64,
    max_retries: u32,
) -> SimResult<String> {
    let attempts = max_retries + 1;
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match textgen.generate(kind, ctx, temperature) {
            Ok(text) => return Ok(text),
            Err(e) => {
                log::warn!("text generation attempt {attempt}/{attempts} failed: {e}");
                last_error = e.to_string();
            }
        }
    }
    Err(SimError::Generation {
        kind: last_error,
        attempts,
    })
}

/// Vocabulary of concrete attribute terms. A review mentioning none
/// of these reads as generic/templated to the skeptical persona.
const ATTRIBUTE_TERMS: [&str; 7] = [
    "sound", "bass", "build", "battery", "comfort", "fit", "plastic",
];

pub fn mentions_product_attributes(text: &str) -> bool {
    let lower = text.to_lowercase();
    ATTRIBUTE_TERMS.iter().any(|term| lower.contains(term))
}

const CRITICAL_TEMPLATES: [&str; 4] = [
    "Disappointed by the muddy bass on the {name}. For Rp {price} I expected much better.",
    "The build feels like cheap plastic and the battery drains fast. Not worth the price.",
    "Sound is flat and the fit gets uncomfortable within an hour. Could be a lot better.",
    "Expected more at this price. The battery life is short and the build creaks.",
];

const BALANCED_TEMPLATES: [&str; 4] = [
    "The sound on the {name} is decent, though the build feels a bit light for Rp {price}.",
    "Great battery life, but comfort could improve on longer sessions. Fair overall.",
    "While the bass is solid, the plastic build keeps this from feeling premium.",
    "Comfort is fine and the sound is acceptable; battery is about average for the class.",
];

const LENIENT_TEMPLATES: [&str; 4] = [
    "Pretty good for the price! The sound does the job and the battery lasts me all day.",
    "Happy with this purchase. Comfortable fit and the build feels fine for Rp {price}.",
    "Does the job well. The bass is decent and the battery holds up. Good value.",
    "The {name} surprised me — comfortable, decent sound, no complaints at this price.",
];

// Generic five-star boilerplate, never naming an attribute.
const FAKE_TEMPLATES: [&str; 6] = [
    "Best purchase ever! Highly recommend!",
    "Amazing quality and super fast shipping! Five stars!",
    "Love it! I recommend it to everyone!",
    "Amazing! Perfect! Great value!",
    "You won't regret it! Worth every penny!",
    "Perfect in every way! Best product!",
];

const BUY_RATIONALES: [&str; 3] = [
    "The ratings look strong and the price works for me.",
    "Reviews point the right way and the value holds up, so I went for it.",
    "Average rating cleared my bar; nothing in the reviews put me off.",
];

const NO_BUY_RATIONALES: [&str; 3] = [
    "The ratings did not convince me at this price.",
    "Too many reviews read alike; I am not comfortable buying.",
    "The average rating is below what I would pay for, so I passed.",
];

const SUSPICIOUS_RATIONALE: &str =
    "A cluster of identical five-star reviews from the same moment looks like a paid campaign.";

/// Deterministic template-based generator. Drives all variation from
/// a dedicated RNG stream so review text never perturbs the agent
/// streams. Temperature is accepted for interface parity with a
/// remote generator and does not alter template choice.
pub struct TemplateGenerator {
    rng: SubsystemRng,
}

impl TemplateGenerator {
    pub fn new(rng: SubsystemRng) -> Self {
        Self { rng }
    }

    fn pick<'t>(&mut self, templates: &[&'t str]) -> &'t str {
        let index = self.rng.next_u64_below(templates.len() as u64) as usize;
        templates[index]
    }

    fn fill(template: &str, product: &ProductSpec) -> String {
        template
            .replace("{name}", &product.name)
            .replace("{price}", &product.price.to_string())
    }
}

impl TextGenerator for TemplateGenerator {
    fn generate(
        &mut self,
        kind: PromptKind,
        ctx: &GenContext<'_>,
        _temperature: f64,
    ) -> Result<String, GenerationError> {
        let text = match kind {
            PromptKind::GenuineReview => {
                let templates = match ctx.personality {
                    Some(Personality::Critical) => &CRITICAL_TEMPLATES,
                    Some(Personality::Lenient) => &LENIENT_TEMPLATES,
                    _ => &BALANCED_TEMPLATES,
                };
                Self::fill(self.pick(templates), ctx.product)
            }
            PromptKind::FakeReview => self.pick(&FAKE_TEMPLATES).to_string(),
            PromptKind::ShopperRationale => {
                let suspicious = matches!(ctx.persona, Some(Persona::Skeptical))
                    && ctx.fake_fraction.is_some_and(|f| f > 0.25);
                match ctx.decision {
                    Some(Decision::Buy) => self.pick(&BUY_RATIONALES).to_string(),
                    _ if suspicious => SUSPICIOUS_RATIONALE.to_string(),
                    _ => self.pick(&NO_BUY_RATIONALES).to_string(),
                }
            }
        };
        Ok(text)
    }
}

/// Test double: fails every call with the given error kind. Used to
/// exercise retry exhaustion and iteration abort paths.
pub struct FailingGenerator {
    pub timeout: bool,
}

impl TextGenerator for FailingGenerator {
    fn generate(
        &mut self,
        _kind: PromptKind,
        _ctx: &GenContext<'_>,
        _temperature: f64,
    ) -> Result<String, GenerationError> {
        if self.timeout {
            Err(GenerationError::Timeout)
        } else {
            Err(GenerationError::Failed("upstream unavailable".into()))
        }
    }
}
