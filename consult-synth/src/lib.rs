//! Rule-based expansion of free-text doctor notes into a `StructuredSummary`.
//!
//! Notes are classified with a fixed keyword table, then an ordered list of
//! condition rules is folded over a default summary. Rules either replace a
//! field (the last matching rule wins) or append to it (every matching rule
//! contributes, in rule order). When nothing matches, a generic fallback fills
//! the summary from the raw notes instead.
//!
//! Keyword matching is plain lowercase substring search with no word
//! boundaries, so `"pain"` also matches "Spain" and `"bp"` can match inside
//! longer words. Changing that would change classification outcomes.

use consult_core::{ConsultationInput, StructuredSummary, SummaryConfig, SummaryError};
use serde::Serialize;

/// Summarize a consultation with the default configuration.
pub fn synthesize(input: &ConsultationInput) -> Result<StructuredSummary, SummaryError> {
    synthesize_with_config(input, &SummaryConfig::default())
}

/// Summarize a consultation.
pub fn synthesize_with_config(
    input: &ConsultationInput,
    config: &SummaryConfig,
) -> Result<StructuredSummary, SummaryError> {
    analyze(input, config).map(|report| report.summary)
}

/// Summarize a consultation from a JSON payload string.
pub fn synthesize_str(
    input_json: &str,
    config: &SummaryConfig,
) -> Result<StructuredSummary, SummaryError> {
    let input: ConsultationInput =
        serde_json::from_str(input_json).map_err(|err| SummaryError::Parse(err.to_string()))?;
    synthesize_with_config(&input, config)
}

/// Summarize a consultation and report how the notes were classified.
pub fn analyze(
    input: &ConsultationInput,
    config: &SummaryConfig,
) -> Result<SynthesisReport, SummaryError> {
    input.validate()?;

    let context = NoteContext::new(input);
    let flags = flags_from_lowercase(&context.lower);
    let mut summary = default_summary(input, config);
    let mut applied = Vec::new();

    let fallback = !flags.any();
    if fallback {
        for edit in fallback_edits(&context, config) {
            apply_edit(&mut summary, edit);
        }
    } else {
        for rule in &CONDITION_RULES {
            if !flags.get(rule.condition) {
                continue;
            }
            for edit in (rule.edits)(&context) {
                apply_edit(&mut summary, edit);
            }
            applied.push(rule.condition);
        }
    }

    summary.additional_notes = additional_notes(input);
    trim_narrative_fields(&mut summary);

    tracing::debug!(
        matched = ?flags.matched(),
        applied = ?applied,
        fallback,
        "synthesized consultation summary"
    );

    Ok(SynthesisReport {
        flags,
        applied,
        fallback,
        summary,
    })
}

/// Result of [`analyze`]: the summary plus the classification behind it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SynthesisReport {
    pub flags: ConditionFlags,
    /// Rules that ran, in evaluation order.
    pub applied: Vec<Condition>,
    /// True when no keyword matched and the generic synthesis was used.
    pub fallback: bool,
    pub summary: StructuredSummary,
}

impl SynthesisReport {
    /// Conditions that were detected but have no synthesis rule.
    pub fn unhandled(&self) -> Vec<Condition> {
        self.flags
            .matched()
            .into_iter()
            .filter(|condition| !self.applied.contains(condition))
            .collect()
    }
}

/// Clinical themes recognised in doctor notes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Headache,
    #[serde(rename = "bp")]
    BloodPressure,
    Diabetes,
    Respiratory,
    Skin,
    Mental,
    Gastro,
    Musculo,
    Infection,
}

/// Keyword table; a condition is flagged when any of its substrings occurs
/// in the lowercased notes.
pub const CONDITION_KEYWORDS: [(Condition, &[&str]); 9] = [
    (Condition::Headache, HEADACHE_KEYWORDS),
    (Condition::BloodPressure, BLOOD_PRESSURE_KEYWORDS),
    (Condition::Diabetes, DIABETES_KEYWORDS),
    (Condition::Respiratory, RESPIRATORY_KEYWORDS),
    (Condition::Skin, SKIN_KEYWORDS),
    (Condition::Mental, MENTAL_KEYWORDS),
    (Condition::Gastro, GASTRO_KEYWORDS),
    (Condition::Musculo, MUSCULO_KEYWORDS),
    (Condition::Infection, INFECTION_KEYWORDS),
];

const HEADACHE_KEYWORDS: &[&str] = &["headache", "head pain", "migraine"];
const BLOOD_PRESSURE_KEYWORDS: &[&str] = &["bp", "blood pressure", "hypertension"];
const DIABETES_KEYWORDS: &[&str] = &["diabetes", "blood sugar", "glucose"];
const RESPIRATORY_KEYWORDS: &[&str] = &["cough", "breathing", "asthma", "wheez"];
const SKIN_KEYWORDS: &[&str] = &["rash", "skin", "eczema"];
const MENTAL_KEYWORDS: &[&str] = &["anxiety", "depression", "stress", "sleep"];
const GASTRO_KEYWORDS: &[&str] = &["stomach", "nausea", "bowel", "abdomen"];
const MUSCULO_KEYWORDS: &[&str] = &["pain", "back", "joint", "muscle"];
const INFECTION_KEYWORDS: &[&str] = &["infection", "fever", "temperature", "antibiotic"];

/// One flag per recognised theme. Flags are independent of each other.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ConditionFlags {
    pub headache: bool,
    pub bp: bool,
    pub diabetes: bool,
    pub respiratory: bool,
    pub skin: bool,
    pub mental: bool,
    pub gastro: bool,
    pub musculo: bool,
    pub infection: bool,
}

impl ConditionFlags {
    pub fn get(&self, condition: Condition) -> bool {
        match condition {
            Condition::Headache => self.headache,
            Condition::BloodPressure => self.bp,
            Condition::Diabetes => self.diabetes,
            Condition::Respiratory => self.respiratory,
            Condition::Skin => self.skin,
            Condition::Mental => self.mental,
            Condition::Gastro => self.gastro,
            Condition::Musculo => self.musculo,
            Condition::Infection => self.infection,
        }
    }

    fn set(&mut self, condition: Condition, value: bool) {
        let slot = match condition {
            Condition::Headache => &mut self.headache,
            Condition::BloodPressure => &mut self.bp,
            Condition::Diabetes => &mut self.diabetes,
            Condition::Respiratory => &mut self.respiratory,
            Condition::Skin => &mut self.skin,
            Condition::Mental => &mut self.mental,
            Condition::Gastro => &mut self.gastro,
            Condition::Musculo => &mut self.musculo,
            Condition::Infection => &mut self.infection,
        };
        *slot = value;
    }

    pub fn any(&self) -> bool {
        CONDITION_KEYWORDS
            .iter()
            .any(|(condition, _)| self.get(*condition))
    }

    /// Flagged conditions in keyword-table order.
    pub fn matched(&self) -> Vec<Condition> {
        CONDITION_KEYWORDS
            .iter()
            .map(|(condition, _)| *condition)
            .filter(|condition| self.get(*condition))
            .collect()
    }
}

/// Classify notes against [`CONDITION_KEYWORDS`]. Every flag is evaluated.
pub fn detect_conditions(notes: &str) -> ConditionFlags {
    flags_from_lowercase(&notes.to_lowercase())
}

fn flags_from_lowercase(lower: &str) -> ConditionFlags {
    let mut flags = ConditionFlags::default();
    for (condition, keywords) in CONDITION_KEYWORDS.iter() {
        flags.set(*condition, keywords.iter().any(|kw| lower.contains(kw)));
    }
    flags
}

struct NoteContext<'a> {
    input: &'a ConsultationInput,
    lower: String,
}

impl<'a> NoteContext<'a> {
    fn new(input: &'a ConsultationInput) -> Self {
        Self {
            input,
            lower: input.doctor_notes.to_lowercase(),
        }
    }

    fn mentions(&self, needle: &str) -> bool {
        self.lower.contains(needle)
    }

    fn mentions_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|needle| self.mentions(needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Diagnosis,
    Symptoms,
    Examination,
    Treatment,
    Medications,
    Lifestyle,
    Education,
    FollowUpNotes,
    RedFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldEdit {
    Replace(Field, String),
    Append(Field, String),
    Refer {
        specialty: &'static str,
        notes: &'static str,
    },
}

fn replace(field: Field, text: impl Into<String>) -> FieldEdit {
    FieldEdit::Replace(field, text.into())
}

fn append(field: Field, text: impl Into<String>) -> FieldEdit {
    FieldEdit::Append(field, text.into())
}

struct ConditionRule {
    condition: Condition,
    edits: fn(&NoteContext<'_>) -> Vec<FieldEdit>,
}

// Evaluation order is significant: later rules overwrite earlier ones.
// Diabetes and skin are detected but have no rule.
const CONDITION_RULES: [ConditionRule; 7] = [
    ConditionRule {
        condition: Condition::Headache,
        edits: headache_edits,
    },
    ConditionRule {
        condition: Condition::BloodPressure,
        edits: blood_pressure_edits,
    },
    ConditionRule {
        condition: Condition::Respiratory,
        edits: respiratory_edits,
    },
    ConditionRule {
        condition: Condition::Mental,
        edits: mental_health_edits,
    },
    ConditionRule {
        condition: Condition::Infection,
        edits: infection_edits,
    },
    ConditionRule {
        condition: Condition::Gastro,
        edits: gastro_edits,
    },
    ConditionRule {
        condition: Condition::Musculo,
        edits: musculoskeletal_edits,
    },
];

fn headache_edits(context: &NoteContext<'_>) -> Vec<FieldEdit> {
    let wants_referral = context.mentions_any(&["refer", "neuro"]);

    let mut edits = vec![
        replace(
            Field::Diagnosis,
            if wants_referral {
                "Recurrent headache / migraine - neurology review requested"
            } else {
                "Tension-type headache / migraine"
            },
        ),
        append(
            Field::Symptoms,
            "Headache reported, with head pain and possible migraine features.",
        ),
        append(
            Field::Examination,
            "No focal neurological symptoms reported. No visual disturbance or neck stiffness described.",
        ),
        replace(
            Field::Treatment,
            "1. Simple analgesia at recommended doses\n\
             2. Keep a headache diary to identify triggers\n\
             3. Avoid analgesic overuse (no more than 10 days per month)\n\
             4. Maintain hydration and regular meals",
        ),
        replace(
            Field::Medications,
            "Paracetamol 1g up to four times daily as required\n\
             Ibuprofen 400mg up to three times daily with food as required",
        ),
        replace(
            Field::Lifestyle,
            "Regular sleep pattern, adequate hydration, limit caffeine and alcohol, regular breaks from screens.",
        ),
        replace(
            Field::Education,
            "Common headache triggers and medication-overuse headache explained. Advised to keep a headache diary.",
        ),
        replace(
            Field::FollowUpNotes,
            "Review headache diary and response to analgesia.",
        ),
        replace(
            Field::RedFlags,
            "Seek urgent help for a sudden severe (thunderclap) headache, headache with fever and neck stiffness, new weakness or confusion, visual loss, or headache after a head injury.",
        ),
    ];

    if wants_referral {
        edits.push(FieldEdit::Refer {
            specialty: "Neurology",
            notes: "Recurrent headaches - specialist neurology opinion requested.",
        });
    }

    edits
}

fn blood_pressure_edits(context: &NoteContext<'_>) -> Vec<FieldEdit> {
    vec![
        replace(
            Field::Diagnosis,
            if context.mentions_any(&["140", "high"]) {
                "Hypertension - Stage 1"
            } else {
                "Hypertension - Under review"
            },
        ),
        append(Field::Symptoms, "Blood pressure concerns discussed."),
        append(
            Field::Examination,
            "Home blood pressure readings reviewed as reported by the patient.",
        ),
        replace(
            Field::Treatment,
            "1. Home blood pressure monitoring twice daily for 7 days\n\
             2. Lifestyle modification as advised\n\
             3. Blood tests (U&E, HbA1c, lipids) and urine ACR\n\
             4. Consider antihypertensive therapy if readings remain raised",
        ),
        replace(
            Field::Medications,
            "No antihypertensive started today - decision pending home blood pressure readings.",
        ),
        replace(
            Field::Lifestyle,
            "Reduce salt intake to under 6g per day, limit alcohol, regular aerobic exercise, weight management and stop smoking if applicable.",
        ),
        replace(
            Field::Education,
            "Hypertension and long-term cardiovascular risk explained. Shown how to record home blood pressure readings.",
        ),
        replace(
            Field::FollowUpNotes,
            "Review home blood pressure diary and blood results.",
        ),
        replace(
            Field::RedFlags,
            "Seek urgent help for chest pain, severe headache, visual disturbance, breathlessness, or blood pressure readings above 180/120.",
        ),
    ]
}

fn respiratory_edits(context: &NoteContext<'_>) -> Vec<FieldEdit> {
    vec![
        replace(
            Field::Diagnosis,
            if context.mentions("asthma") {
                "Asthma - suboptimal control"
            } else {
                "Upper respiratory tract symptoms - likely viral"
            },
        ),
        append(
            Field::Symptoms,
            "Respiratory symptoms including cough or breathing difficulty.",
        ),
        append(
            Field::Examination,
            "Speaking in full sentences with no increased work of breathing observed during the consultation.",
        ),
        replace(
            Field::Treatment,
            "1. Rest and adequate fluids\n\
             2. Check inhaler technique and adherence where prescribed\n\
             3. Monitor symptoms and seek review if worsening",
        ),
        replace(
            Field::Medications,
            if context.mentions("inhaler") {
                "Salbutamol 100mcg inhaler, 2 puffs as required (maximum 8 puffs in 24 hours)"
            } else {
                "Simple linctus 5ml four times daily as required"
            },
        ),
        replace(
            Field::FollowUpNotes,
            "Review respiratory symptoms and inhaler use.",
        ),
        replace(
            Field::RedFlags,
            "Seek urgent help for severe breathlessness, inability to complete sentences, blue lips, chest pain, or coughing up blood.",
        ),
    ]
}

fn mental_health_edits(context: &NoteContext<'_>) -> Vec<FieldEdit> {
    vec![
        replace(
            Field::Diagnosis,
            if context.mentions("anxiety") {
                "Generalised anxiety symptoms"
            } else {
                "Low mood and stress-related symptoms"
            },
        ),
        append(
            Field::Symptoms,
            "Psychological symptoms affecting mood, stress levels or sleep.",
        ),
        append(
            Field::Examination,
            "Mental state: alert and engaged, good rapport, no thoughts of self-harm disclosed.",
        ),
        replace(
            Field::Treatment,
            "1. Referral to psychological therapies\n\
             2. Guided self-help resources provided\n\
             3. Sleep hygiene measures\n\
             4. Safety plan discussed",
        ),
        replace(
            Field::Medications,
            if context.mentions("sertraline") {
                "Sertraline 50mg once daily - counselled on side effects and delayed onset of benefit"
            } else {
                "No medication started - psychological therapy first line"
            },
        ),
        replace(
            Field::Lifestyle,
            "Regular exercise, consistent sleep routine, limit alcohol and caffeine, stay connected with friends and family.",
        ),
        replace(
            Field::Education,
            "Common symptoms of stress and anxiety explained. Self-help resources and crisis contacts provided.",
        ),
        replace(
            Field::FollowUpNotes,
            "Review mood, sleep and engagement with psychological services.",
        ),
        replace(
            Field::RedFlags,
            "Contact NHS 111, the local crisis team or call 999 if you have thoughts of harming yourself or others, or feel unable to keep yourself safe.",
        ),
        FieldEdit::Refer {
            specialty: "IAPT / Psychological Services",
            notes: "Referred for psychological therapies assessment.",
        },
    ]
}

fn infection_edits(context: &NoteContext<'_>) -> Vec<FieldEdit> {
    let diagnosis = if context.mentions("uti") {
        "Suspected urinary tract infection"
    } else if context.mentions("throat") {
        "Sore throat - likely viral pharyngitis"
    } else {
        "Suspected infection - source under review"
    };

    vec![
        replace(Field::Diagnosis, diagnosis),
        append(
            Field::Symptoms,
            "Symptoms suggestive of infection, including fever or raised temperature.",
        ),
        append(
            Field::Examination,
            "Patient-reported temperature reviewed. No features of sepsis described.",
        ),
        replace(
            Field::Treatment,
            "1. Antipyretics and adequate fluid intake\n\
             2. Antibiotics only if clinically indicated\n\
             3. Safety-netting advice given",
        ),
        replace(
            Field::Medications,
            "Paracetamol 1g up to four times daily for fever. Antibiotics as clinically indicated.",
        ),
        replace(
            Field::FollowUpNotes,
            "Review if symptoms are not improving within 48-72 hours.",
        ),
        replace(
            Field::RedFlags,
            "Seek urgent help for a high fever that does not settle, confusion, rapid breathing, mottled skin, or reduced urine output.",
        ),
    ]
}

fn gastro_edits(_context: &NoteContext<'_>) -> Vec<FieldEdit> {
    vec![
        replace(
            Field::Diagnosis,
            "Gastrointestinal symptoms under investigation",
        ),
        append(
            Field::Symptoms,
            "Gastrointestinal symptoms affecting the stomach or bowel.",
        ),
        append(
            Field::Examination,
            "Abdominal symptoms reviewed remotely. No features of peritonism described.",
        ),
        replace(
            Field::Treatment,
            "1. Oral fluids and small, bland meals\n\
             2. Keep a food and symptom diary\n\
             3. Stool and blood tests if symptoms persist",
        ),
        replace(
            Field::FollowUpNotes,
            "Review gastrointestinal symptoms and any test results.",
        ),
        replace(
            Field::RedFlags,
            "Seek urgent help for blood in stool or vomit, black stools, severe abdominal pain, persistent vomiting, or unintentional weight loss.",
        ),
    ]
}

fn musculoskeletal_edits(context: &NoteContext<'_>) -> Vec<FieldEdit> {
    let body_part = if context.mentions("back") {
        "lower back"
    } else if context.mentions("joint") {
        "joint"
    } else {
        "soft tissue"
    };
    let diagnosis = format!("Musculoskeletal {body_part} pain");
    let symptoms = format!("{diagnosis} reported.");

    vec![
        replace(Field::Diagnosis, diagnosis),
        append(Field::Symptoms, symptoms),
        append(
            Field::Examination,
            "Range of movement assessed remotely as demonstrated by the patient.",
        ),
        replace(
            Field::Treatment,
            "1. Stay active and continue normal activities as able\n\
             2. Simple analgesia\n\
             3. Heat or cold packs\n\
             4. Physiotherapy self-referral if not improving",
        ),
        replace(
            Field::Medications,
            "Ibuprofen 400mg three times daily with food for up to 7 days, or paracetamol 1g up to four times daily",
        ),
        replace(
            Field::FollowUpNotes,
            "Review pain and function; consider physiotherapy.",
        ),
        replace(
            Field::RedFlags,
            "Seek urgent help for loss of bladder or bowel control, numbness around the buttocks, progressive leg weakness, or fever with back pain.",
        ),
    ]
}

fn fallback_edits(context: &NoteContext<'_>, config: &SummaryConfig) -> Vec<FieldEdit> {
    let input = context.input;
    let notes = input.doctor_notes.as_str();

    vec![
        replace(
            Field::Diagnosis,
            format!(
                "Clinical assessment - {}",
                input.chief_complaint().unwrap_or("symptoms as described")
            ),
        ),
        replace(
            Field::Symptoms,
            input
                .current_symptoms()
                .unwrap_or_else(|| excerpt(notes, config.symptom_excerpt_chars)),
        ),
        replace(
            Field::Treatment,
            format!(
                "Management plan as discussed. {}",
                excerpt(notes, config.plan_excerpt_chars)
            ),
        ),
        replace(Field::FollowUpNotes, "Review as clinically indicated."),
        replace(
            Field::RedFlags,
            "Seek urgent medical attention if symptoms worsen, new symptoms develop, or you feel acutely unwell.",
        ),
    ]
}

fn default_summary(input: &ConsultationInput, config: &SummaryConfig) -> StructuredSummary {
    StructuredSummary {
        diagnosis: "Clinical assessment based on presenting symptoms".to_string(),
        symptoms_presented: input
            .chief_complaint()
            .unwrap_or("As described in consultation")
            .to_string(),
        examination_findings: format!(
            "General examination conducted via {} consultation.",
            input.consultation_type
        ),
        treatment_plan: "Management plan as discussed during consultation.".to_string(),
        medications_prescribed: input
            .current_medications()
            .unwrap_or("No new medications prescribed.")
            .to_string(),
        lifestyle_recommendations:
            "Maintain a balanced diet, regular physical activity and adequate sleep.".to_string(),
        patient_education:
            "Diagnosis and management plan explained. Patient given the opportunity to ask questions."
                .to_string(),
        follow_up_required: true,
        follow_up_notes: "Follow up to review progress and response to treatment.".to_string(),
        follow_up_timeframe: config.follow_up_timeframe.clone(),
        referral_required: false,
        referral_specialty: String::new(),
        referral_notes: String::new(),
        red_flags: String::new(),
        additional_notes: String::new(),
    }
}

fn additional_notes(input: &ConsultationInput) -> String {
    let allergy_status = match input.allergies() {
        Some(allergies) if allergies != "None reported" => {
            format!("Known allergies: {allergies}.")
        }
        _ => "NKDA.".to_string(),
    };

    format!(
        "Summary generated from {} consultation. {allergy_status}",
        input.consultation_type
    )
}

fn apply_edit(summary: &mut StructuredSummary, edit: FieldEdit) {
    match edit {
        FieldEdit::Replace(field, text) => *field_mut(summary, field) = text,
        FieldEdit::Append(field, text) => {
            let slot = field_mut(summary, field);
            if !slot.is_empty() {
                slot.push(' ');
            }
            slot.push_str(&text);
        }
        FieldEdit::Refer { specialty, notes } => {
            summary.referral_required = true;
            summary.referral_specialty = specialty.to_string();
            summary.referral_notes = notes.to_string();
        }
    }
}

fn field_mut(summary: &mut StructuredSummary, field: Field) -> &mut String {
    match field {
        Field::Diagnosis => &mut summary.diagnosis,
        Field::Symptoms => &mut summary.symptoms_presented,
        Field::Examination => &mut summary.examination_findings,
        Field::Treatment => &mut summary.treatment_plan,
        Field::Medications => &mut summary.medications_prescribed,
        Field::Lifestyle => &mut summary.lifestyle_recommendations,
        Field::Education => &mut summary.patient_education,
        Field::FollowUpNotes => &mut summary.follow_up_notes,
        Field::RedFlags => &mut summary.red_flags,
    }
}

fn trim_narrative_fields(summary: &mut StructuredSummary) {
    for value in [
        &mut summary.symptoms_presented,
        &mut summary.examination_findings,
        &mut summary.treatment_plan,
        &mut summary.medications_prescribed,
        &mut summary.additional_notes,
    ] {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
}

/// Leading `max_chars` characters of `text`, never splitting a code point.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
