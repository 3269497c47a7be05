//! Stage 4: turn the chosen category into a media artifact plus copy.

use clipcast_core::render_prompt;
use rand::Rng;

use crate::error::PipelineError;
use crate::services::{CallPolicy, ContentGenerationService, TextGenerationService};

pub const TITLE_PROMPT: &str = "Create a catchy title for a video about";
pub const DESCRIPTION_PROMPT: &str =
    "Create an optimized description with hashtags for a video about";

/// Everything the publisher needs for one piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub prompt: String,
    pub artifact: String,
    pub title: String,
    pub description: String,
}

/// Pick one template uniformly at random.
pub fn choose_template<'a, R: Rng + ?Sized>(
    templates: &'a [String],
    rng: &mut R,
) -> Option<&'a str> {
    if templates.is_empty() {
        return None;
    }
    let index = rng.random_range(0..templates.len());
    Some(templates[index].as_str())
}

/// Renders `template` for `topic` and asks the collaborators for the
/// artifact, a title and a description, in that order.
///
/// # Errors
///
/// Any collaborator failure, or an empty artifact reference, title or
/// description, is returned as a [`PipelineError`]. Cancellation surfaces as
/// [`PipelineError::Cancelled`].
pub async fn generate_content(
    content: &dyn ContentGenerationService,
    text: &dyn TextGenerationService,
    template: &str,
    topic: &str,
    policy: &CallPolicy,
) -> Result<GeneratedContent, PipelineError> {
    let prompt = render_prompt(template, topic);
    tracing::info!(topic, "generating content");

    let artifact = policy
        .call(content.generate(&prompt))
        .await
        .map_err(PipelineError::from_generation)?;
    if artifact.trim().is_empty() {
        return Err(PipelineError::EmptyOutput("artifact reference"));
    }

    let title = generate_text(text, "title", &format!("{TITLE_PROMPT} {topic}"), policy).await?;
    let description = generate_text(
        text,
        "description",
        &format!("{DESCRIPTION_PROMPT} {topic}"),
        policy,
    )
    .await?;

    tracing::info!(artifact = %artifact, "content generated");
    Ok(GeneratedContent {
        prompt,
        artifact,
        title,
        description,
    })
}

async fn generate_text(
    text: &dyn TextGenerationService,
    field: &'static str,
    prompt: &str,
    policy: &CallPolicy,
) -> Result<String, PipelineError> {
    let output = policy
        .call(text.generate(prompt))
        .await
        .map_err(|e| PipelineError::from_text(field, e))?;
    if output.trim().is_empty() {
        return Err(PipelineError::EmptyOutput(field));
    }
    Ok(output)
}
