// CV pipeline prompt templates and snippet labels.
// All model-facing text for the cv module is defined here.

pub const CV_EXTRACTION_SYSTEM: &str = "\
You are an expert ATS (Applicant Tracking System). Your job is to convert CVs into structured JSON.

Extract:
- profile (professional summary, string)
- experience (array of objects with: role, company, dates, description)
- skills (array of strings)
- projects (array of objects with: name, stack, details)

IMPORTANT: Respond ONLY with a single valid JSON object. No markdown, no code fences, no explanations.";

/// User prompt for text documents. `{media_type}` and `{content}` are substituted.
pub const CV_TEXT_PROMPT: &str = "Analyze the following CV content (format {media_type}):\n\n{content}";

/// User prompt accompanying an attached document.
pub const CV_ATTACHMENT_PROMPT: &str = "Analyze this CV.";

pub const PROFILE_LABEL: &str = "Profile";
pub const SKILLS_LABEL: &str = "Skills";

pub fn experience_snippet(role: &str, company: &str, dates: &str, description: &str) -> String {
    format!("Experience: {role} at {company} ({dates}). Details: {description}")
}

pub fn project_snippet(name: &str, stack: &str, details: &str) -> String {
    format!("Project: {name}. Tech Stack: {stack}. Details: {details}")
}
