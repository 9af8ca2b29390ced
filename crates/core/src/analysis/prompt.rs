//! Prompt text sent to the model.

use telecare_files::ExtractedDocument;

/// Placed between documents in the assembled body.
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a clinical documentation assistant. \
Summarize the medical documents you are given for a clinician. Attribute findings to the \
document they come from and do not mix content between documents. Respond with a JSON object \
with exactly these keys: \"title\" (a short title for the set of documents), \"content\" (a \
concise narrative summary) and \"keyPoints\" (an array of short strings).";

pub const SYMPTOM_SYSTEM_PROMPT: &str = "You are a triage assistant for a telehealth service. \
Assess the patient's description (and image, if one is attached) and respond with a JSON \
object with exactly these keys: \"priority\" (one of \"low\", \"medium\", \"high\", \
\"urgent\"), \"recommendedSpecialties\" (an array of medical specialties) and \"description\" \
(a short explanation for the patient). Do not give a diagnosis.";

/// Labels every document with its name and joins them with [`DOCUMENT_SEPARATOR`].
pub fn assemble_prompt_body(documents: &[ExtractedDocument]) -> String {
    documents
        .iter()
        .map(|document| format!("### Document: {} ###\n{}", document.name(), document.text()))
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

pub fn summary_user_prompt(body: &str) -> String {
    format!("Summarize the following documents.\n\n{body}")
}

/// `specialties` restricts the answer when non-empty.
pub fn symptom_user_prompt(symptoms: &str, specialties: &[String]) -> String {
    if specialties.is_empty() {
        format!("Patient description:\n{symptoms}")
    } else {
        format!(
            "Patient description:\n{symptoms}\n\nOnly recommend specialties from this list: {}.",
            specialties.join(", ")
        )
    }
}
