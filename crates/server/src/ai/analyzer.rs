//! Patient case analysis: prompt the model as an emergency physician and
//! slice the narrative reply into sections.

use std::sync::LazyLock;

use docpilot_core::{ClinicalAnalysis, ClinicalError, DEFAULT_REFERENCES, PatientData};
use regex::Regex;

use super::client::{ChatModel, Prompt};

const SYSTEM_PROMPT: &str = "You are an expert emergency medicine and primary care physician with 20+ years of experience. Provide evidence-based clinical analysis with proper medical citations. Focus on intelligent clinical reasoning and efficient decision-making.";

/// Domains the provider may search when grounding the analysis
const MEDICAL_DOMAINS: [&str; 5] = [
    "ncbi.nlm.nih.gov",
    "mayoclinic.org",
    "aafp.org",
    "acep.org",
    "uptodate.com",
];

const MAX_REFERENCES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Problem,
    Relevant,
    Irrelevant,
    Priority,
    Actions,
    FollowUp,
    Reasoning,
}

fn header(title: &str) -> Regex {
    Regex::new(&format!(r"(?im)^[ \t#*]*{title}[ \t*]*:[ \t*]*")).unwrap()
}

static HEADERS: LazyLock<Vec<(Section, Regex)>> = LazyLock::new(|| {
    vec![
        (Section::Problem, header("CLINICAL PROBLEM")),
        (Section::Relevant, header("RELEVANT MEDICAL FACTORS")),
        (Section::Irrelevant, header(r"IRRELEVANT FACTORS[^:\n]*")),
        (Section::Priority, header("PRIORITY TREATMENT PLAN")),
        (Section::Actions, header("DETAILED ACTION STEPS")),
        (Section::FollowUp, header("FOLLOW-UP RECOMMENDATIONS")),
        (Section::Reasoning, header("CLINICAL REASONING")),
    ]
});

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s*").unwrap());

static STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^step\s*\d+\s*[:.]?\s*").unwrap());

static CITATIONS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"https?://[^\s)]+").unwrap(),
        Regex::new(r"www\.[^\s)]+").unwrap(),
        Regex::new(r"\[.*?\]").unwrap(),
        Regex::new(r"Source:.*").unwrap(),
    ]
});

/// Section bodies keyed by header, in document order.
fn split_sections(text: &str) -> Vec<(Section, &str)> {
    let mut found: Vec<(usize, usize, Section)> = HEADERS
        .iter()
        .flat_map(|(section, re)| re.find_iter(text).map(move |m| (m.start(), m.end(), *section)))
        .collect();
    found.sort_by_key(|(start, _, _)| *start);

    found
        .iter()
        .enumerate()
        .map(|(i, (_, end, section))| {
            let stop = found.get(i + 1).map_or(text.len(), |(next, _, _)| *next);
            (*section, &text[*end..stop.max(*end)])
        })
        .collect()
}

fn bullets(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(['-', '*', '•']))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn numbered(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| NUMBERED.is_match(line))
        .map(|line| NUMBERED.replace(line, "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn steps(body: &str) -> Vec<String> {
    body.lines()
        .map(|line| line.trim().trim_start_matches('*'))
        .filter(|line| STEP.is_match(line))
        .map(|line| STEP.replace(line, "").trim_start_matches('*').trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn first_paragraph(body: &str) -> Option<String> {
    body.trim()
        .split("\n\n")
        .next()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Provider citations first, then links and source markers found in the text.
fn references(text: &str, provided: &[String]) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let found = CITATIONS.iter().flat_map(|re| {
        re.find_iter(text)
            .map(|m| m.as_str().trim().trim_end_matches(['.', ',', ';']).to_string())
    });

    for candidate in provided.iter().cloned().chain(found) {
        if refs.len() == MAX_REFERENCES {
            break;
        }
        if !candidate.is_empty() && !refs.contains(&candidate) {
            refs.push(candidate);
        }
    }

    if refs.is_empty() {
        DEFAULT_REFERENCES.iter().map(|r| r.to_string()).collect()
    } else {
        refs
    }
}

/// Parse a sectioned clinical narrative. Never fails: text without any
/// recognised header yields [`ClinicalAnalysis::fallback`].
pub fn parse_clinical_response(text: &str, citations: &[String]) -> ClinicalAnalysis {
    if text.trim().is_empty() {
        return ClinicalAnalysis::fallback(text, "empty response");
    }

    let sections = split_sections(text);
    if sections.is_empty() {
        tracing::warn!(chars = text.len(), "No recognizable sections in clinical response");
        return ClinicalAnalysis::fallback(text, "no recognizable sections");
    }

    let body = |wanted: Section| {
        sections
            .iter()
            .find(|(section, _)| *section == wanted)
            .map(|(_, body)| *body)
    };

    let analysis = ClinicalAnalysis {
        problem: body(Section::Problem)
            .and_then(first_paragraph)
            .unwrap_or_else(|| "Clinical assessment pending".to_string()),
        relevant_factors: body(Section::Relevant).map(bullets).unwrap_or_default(),
        excluded_factors: body(Section::Irrelevant).map(bullets).unwrap_or_default(),
        priority_order: body(Section::Priority).map(numbered).unwrap_or_default(),
        action_plan: body(Section::Actions).map(steps).unwrap_or_default(),
        follow_up_recommendations: body(Section::FollowUp).map(bullets).unwrap_or_default(),
        filtering_rationale: body(Section::Reasoning)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map_or_else(|| "AI-powered clinical analysis completed".to_string(), str::to_string),
        clinical_references: references(text, citations),
        raw_ai_response: text.to_string(),
        error: None,
    };

    tracing::debug!(sections = sections.len(), "Parsed clinical response");
    analysis
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join("; ")
    }
}

fn clinical_prompt(patient: &PatientData) -> String {
    let details = &patient.personal_details;
    let vitals = if patient.vital_signs.is_empty() {
        "Not provided".to_string()
    } else {
        serde_json::to_string(&patient.vital_signs).unwrap_or_else(|_| "Not provided".to_string())
    };

    format!(
        r#"You are an expert emergency medicine physician analyzing a patient case. Provide intelligent clinical analysis with evidence-based recommendations.

PATIENT DATA:
- Age: {age} years old
- Gender: {gender}
- Name: {name}
- Current Complaint: {complaint}
- Medical History: {history}
- Current Medications: {medications}
- Vital Signs: {vitals}

ANALYSIS REQUIREMENTS:
You must provide a structured clinical analysis that focuses ONLY on factors relevant to the current complaint. Use intelligent filtering to identify which medical history items matter and which should be ignored.

REQUIRED OUTPUT FORMAT:

CLINICAL PROBLEM:
[One clear sentence describing the primary clinical problem based on the complaint]

RELEVANT MEDICAL FACTORS:
- [Factor 1]: [Why it matters for current complaint]
- [Factor 2]: [Why it matters for diagnosis/treatment]
- [Factor 3]: [Why it affects management]

IRRELEVANT FACTORS (FILTERED OUT):
- [Condition]: [Why it doesn't matter for current complaint]

PRIORITY TREATMENT PLAN:
1. [Most urgent immediate action with specific details]
2. [Second priority intervention with clinical reasoning]
3. [Third action or follow-up care with timeline]

DETAILED ACTION STEPS:
Step 1: [Specific diagnostic or therapeutic action with medical details]
Step 2: [Secondary intervention with clinical rationale]
Step 3: [Follow-up care with specific timeline and monitoring]

FOLLOW-UP RECOMMENDATIONS:
- [Specific follow-up timeline based on condition severity]
- [Warning signs patient should watch for]
- [When to return immediately or seek urgent care]
- [Specialist referrals if needed with timeline]

CLINICAL REASONING:
[Explain your filtering logic - why certain conditions were included/excluded based on the current complaint.]

Focus on evidence-based medicine. For trauma cases involving falls, consider fracture risk, imaging needs, pain management, and complications. For patients with diabetes, consider healing implications. For patients with metal implants, consider MRI contraindications.

Provide citations from reputable medical sources to support your recommendations."#,
        age = details.age_or("Unknown"),
        gender = details.gender_or("Unknown"),
        name = details.name_or("Patient"),
        complaint = patient.complaint_or("No complaint"),
        history = list_or_none(&patient.medical_history),
        medications = list_or_none(&patient.current_medications),
    )
}

/// Ask the model for a sectioned analysis of one patient case.
pub async fn analyze_patient(
    model: &dyn ChatModel,
    patient: &PatientData,
) -> Result<ClinicalAnalysis, ClinicalError> {
    let prompt = Prompt::new(SYSTEM_PROMPT, clinical_prompt(patient))
        .max_tokens(2000)
        .top_p(0.9)
        .cited_from(&MEDICAL_DOMAINS);

    let completion = model.complete(&prompt).await?;
    tracing::info!(
        chars = completion.content.len(),
        citations = completion.citations.len(),
        "Clinical analysis received"
    );

    Ok(parse_clinical_response(&completion.content, &completion.citations))
}
