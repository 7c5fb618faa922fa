// Prompt constants for the AI task kinds served by the queue subsystem.

/// System prompt for suggestion generation. Output must stay line-oriented
/// so the bullet parser can pick it apart.
pub const SUGGESTIONS_SYSTEM: &str = "You are an expert resume writer. \
    Respond with plain-text bullet points, one per line, each starting with '-'. \
    Do NOT include headings, numbering, or any commentary outside the bullet lines.";

/// Suggestion prompt template. Replace `{job_description}` before sending.
pub const SUGGESTIONS_PROMPT_TEMPLATE: &str = "\
Based on the following job description, generate 3-7 bullet point suggestions \
for the experience section of a resume. Focus on actionable verbs and \
quantifiable results.

JOB DESCRIPTION:
{job_description}";

/// System prompt for text correction.
pub const CORRECTION_SYSTEM: &str = "You are a meticulous copy editor. \
    Only return the corrected text. \
    Do NOT include quotes, preamble, or explanations.";

/// Correction prompt template. Replace `{text}` before sending.
pub const CORRECTION_PROMPT_TEMPLATE: &str = "\
Correct the grammar, spelling, and punctuation of the following text, and \
improve clarity and conciseness where possible. Only return the corrected \
text.

TEXT:
{text}";
