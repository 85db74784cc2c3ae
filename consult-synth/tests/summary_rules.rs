use consult_core::{ConsultationInput, ConsultationType, SummaryConfig, SummaryError};
use consult_synth::{analyze, detect_conditions, synthesize, Condition, ConditionFlags};

const IAPT: &str = "IAPT / Psychological Services";

fn notes(text: &str) -> ConsultationInput {
    ConsultationInput::from_notes(text)
}

fn diagnosis_for(text: &str) -> String {
    synthesize(&notes(text)).unwrap().diagnosis
}

#[test]
fn empty_notes_are_rejected() {
    for text in ["", "   \n\t"] {
        assert!(matches!(
            synthesize(&notes(text)),
            Err(SummaryError::InvalidInput(_))
        ));
    }
}

#[test]
fn synthesis_is_deterministic() {
    let input = ConsultationInput {
        chief_complaint: "Headache".to_string(),
        allergies: "Latex".to_string(),
        ..notes("Headache with stress at work, cough, fever and back pain")
    };

    let first = serde_json::to_string(&synthesize(&input).unwrap()).unwrap();
    let second = serde_json::to_string(&synthesize(&input).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn keyword_matching_is_case_insensitive_substring() {
    let flags = detect_conditions("WHEEZY chest, Hypertension, Holiday in Spain");
    assert!(flags.respiratory);
    assert!(flags.bp);
    // "spain" contains "pain"
    assert!(flags.musculo);
    assert!(!flags.headache);
}

#[test]
fn all_flags_can_match_together() {
    let flags = detect_conditions(
        "headache, blood pressure, glucose, cough, rash, anxiety, nausea, joint, fever",
    );
    assert_eq!(
        flags,
        ConditionFlags {
            headache: true,
            bp: true,
            diabetes: true,
            respiratory: true,
            skin: true,
            mental: true,
            gastro: true,
            musculo: true,
            infection: true,
        }
    );

    let report = analyze(
        &notes("headache, blood pressure, glucose, cough, rash, anxiety, nausea, joint, fever"),
        &SummaryConfig::default(),
    )
    .unwrap();
    assert_eq!(
        report.applied,
        vec![
            Condition::Headache,
            Condition::BloodPressure,
            Condition::Respiratory,
            Condition::Mental,
            Condition::Infection,
            Condition::Gastro,
            Condition::Musculo,
        ]
    );

    let summary = &report.summary;
    assert_eq!(summary.diagnosis, "Musculoskeletal joint pain");
    for text in [
        &summary.diagnosis,
        &summary.symptoms_presented,
        &summary.examination_findings,
        &summary.treatment_plan,
        &summary.medications_prescribed,
        &summary.lifestyle_recommendations,
        &summary.patient_education,
        &summary.follow_up_notes,
        &summary.follow_up_timeframe,
        &summary.red_flags,
        &summary.additional_notes,
    ] {
        assert!(!text.is_empty());
    }
    assert!(summary.follow_up_required);
    assert!(summary.referral_required);
    assert_eq!(summary.referral_specialty, IAPT);
    assert!(!summary.referral_notes.is_empty());
}

#[test]
fn unmatched_notes_use_fallback() {
    let summary = synthesize(&notes("routine check, feeling fine")).unwrap();
    assert_eq!(
        summary.diagnosis,
        "Clinical assessment - symptoms as described"
    );
    assert_eq!(summary.follow_up_notes, "Review as clinically indicated.");
    assert_eq!(summary.symptoms_presented, "routine check, feeling fine");
    assert_eq!(
        summary.treatment_plan,
        "Management plan as discussed. routine check, feeling fine"
    );
    assert!(summary.follow_up_required);
    assert!(!summary.red_flags.is_empty());

    let input = ConsultationInput {
        chief_complaint: "Annual review".to_string(),
        current_symptoms: "None".to_string(),
        ..notes("routine check, feeling fine")
    };
    let summary = synthesize(&input).unwrap();
    assert_eq!(summary.diagnosis, "Clinical assessment - Annual review");
    assert_eq!(summary.symptoms_presented, "None");
}

#[test]
fn fallback_truncates_long_notes() {
    let long_notes = "x".repeat(500);
    let summary = synthesize(&notes(&long_notes)).unwrap();
    assert_eq!(summary.symptoms_presented.chars().count(), 200);
    assert_eq!(
        summary.treatment_plan,
        format!("Management plan as discussed. {}", "x".repeat(300))
    );

    let config = SummaryConfig {
        symptom_excerpt_chars: 10,
        plan_excerpt_chars: 5,
        ..SummaryConfig::default()
    };
    let report = analyze(&notes(&long_notes), &config).unwrap();
    assert!(report.fallback);
    assert_eq!(report.summary.symptoms_presented, "x".repeat(10));
    assert_eq!(
        report.summary.treatment_plan,
        "Management plan as discussed. xxxxx"
    );
}

#[test]
fn later_rules_overwrite_while_symptoms_accumulate() {
    let input = ConsultationInput {
        chief_complaint: "Headaches".to_string(),
        ..notes("headache with stress")
    };
    let report = analyze(&input, &SummaryConfig::default()).unwrap();
    assert_eq!(
        report.applied,
        vec![Condition::Headache, Condition::Mental]
    );

    let summary = report.summary;
    assert_eq!(summary.diagnosis, "Low mood and stress-related symptoms");
    assert_eq!(
        summary.medications_prescribed,
        "No medication started - psychological therapy first line"
    );

    let symptoms = &summary.symptoms_presented;
    assert!(symptoms.starts_with("Headaches "));
    assert!(symptoms.contains("Headache reported"));
    assert!(symptoms.contains("Psychological symptoms affecting mood"));

    let exam = &summary.examination_findings;
    let opening = "General examination conducted via video consultation.";
    let headache_at = exam.find("No focal neurological").unwrap();
    let mental_at = exam.find("Mental state").unwrap();
    assert!(exam.starts_with(opening));
    assert!(headache_at < mental_at);
}

#[test]
fn mental_health_always_refers_to_psychological_services() {
    for text in [
        "work stress",
        "poor sleep for months",
        "anxiety, started sertraline",
        "migraine and depression, refer to neuro",
    ] {
        let summary = synthesize(&notes(text)).unwrap();
        assert!(summary.referral_required, "{text}");
        assert_eq!(summary.referral_specialty, IAPT);
        assert!(!summary.referral_notes.is_empty());
    }
}

#[test]
fn mental_health_branches_on_anxiety_and_sertraline() {
    let summary = synthesize(&notes("anxiety, started sertraline")).unwrap();
    let medications = &summary.medications_prescribed;
    assert_eq!(summary.diagnosis, "Generalised anxiety symptoms");
    assert!(medications.starts_with("Sertraline 50mg"));
}

#[test]
fn headache_refers_to_neurology_only_when_asked() {
    let summary = synthesize(&notes("recurrent migraine")).unwrap();
    assert!(!summary.referral_required);
    assert_eq!(summary.referral_specialty, "");
    assert_eq!(summary.referral_notes, "");
    assert_eq!(summary.diagnosis, "Tension-type headache / migraine");

    let summary = synthesize(&notes("recurrent migraine, refer")).unwrap();
    assert!(summary.referral_required);
    assert_eq!(summary.referral_specialty, "Neurology");
}

#[test]
fn headache_with_blood_pressure_keeps_neurology_referral() {
    let input = notes("Patient reports headache and migraine, BP 150/95, refer to neuro");
    let report = analyze(&input, &SummaryConfig::default()).unwrap();

    assert!(report.flags.headache);
    assert!(report.flags.bp);
    assert_eq!(
        report.flags.matched(),
        vec![Condition::Headache, Condition::BloodPressure]
    );

    let summary = report.summary;
    assert_eq!(summary.diagnosis, "Hypertension - Under review");
    assert!(summary.referral_required);
    assert_eq!(summary.referral_specialty, "Neurology");
}

#[test]
fn blood_pressure_stage_depends_on_reading() {
    let summary = synthesize(&notes("BP 145/92 on repeat")).unwrap();
    assert_eq!(summary.diagnosis, "Hypertension - Under review");

    let summary = synthesize(&notes("BP 140/90")).unwrap();
    assert_eq!(summary.diagnosis, "Hypertension - Stage 1");

    let summary = synthesize(&notes("High blood pressure")).unwrap();
    assert_eq!(summary.diagnosis, "Hypertension - Stage 1");
}

#[test]
fn respiratory_branches_on_asthma_and_inhaler() {
    let summary = synthesize(&notes("asthma flare, uses inhaler")).unwrap();
    let medications = &summary.medications_prescribed;
    assert_eq!(summary.diagnosis, "Asthma - suboptimal control");
    assert!(medications.starts_with("Salbutamol"));
    assert_eq!(
        summary.lifestyle_recommendations,
        "Maintain a balanced diet, regular physical activity and adequate sleep."
    );

    let summary = synthesize(&notes("dry cough")).unwrap();
    let medications = &summary.medications_prescribed;
    assert_eq!(
        summary.diagnosis,
        "Upper respiratory tract symptoms - likely viral"
    );
    assert!(medications.starts_with("Simple linctus"));
}

#[test]
fn infection_diagnosis_is_three_way() {
    assert_eq!(
        diagnosis_for("fever, suspected uti"),
        "Suspected urinary tract infection"
    );
    assert_eq!(
        diagnosis_for("fever and sore throat"),
        "Sore throat - likely viral pharyngitis"
    );
    assert_eq!(
        diagnosis_for("fever since yesterday"),
        "Suspected infection - source under review"
    );
}

#[test]
fn gastro_scenario_sets_safety_netting() {
    let report = analyze(
        &notes("mild stomach ache, no red flags"),
        &SummaryConfig::default(),
    )
    .unwrap();
    assert_eq!(report.flags.matched(), vec![Condition::Gastro]);
    assert_eq!(
        report.summary.diagnosis,
        "Gastrointestinal symptoms under investigation"
    );
    assert!(report.summary.red_flags.contains("blood in stool"));
}

#[test]
fn musculoskeletal_diagnosis_names_body_part() {
    assert_eq!(
        diagnosis_for("lower back ache after lifting"),
        "Musculoskeletal lower back pain"
    );
    assert_eq!(
        diagnosis_for("knee joint stiffness"),
        "Musculoskeletal joint pain"
    );
    assert_eq!(
        diagnosis_for("muscle strain"),
        "Musculoskeletal soft tissue pain"
    );
}

#[test]
fn diabetes_and_skin_are_detected_without_effect() {
    for (text, condition) in [
        ("blood sugar review", Condition::Diabetes),
        ("eczema flare", Condition::Skin),
    ] {
        let report = analyze(&notes(text), &SummaryConfig::default()).unwrap();
        let summary = &report.summary;
        assert_eq!(report.flags.matched(), vec![condition]);
        assert!(report.applied.is_empty());
        assert!(!report.fallback);
        assert_eq!(report.unhandled(), vec![condition]);
        assert_eq!(
            summary.diagnosis,
            "Clinical assessment based on presenting symptoms"
        );
        assert_eq!(
            summary.symptoms_presented,
            "As described in consultation"
        );
        assert_eq!(summary.red_flags, "");
    }
}

#[test]
fn allergy_status_closes_additional_notes() {
    let mut input = notes("routine check");
    let summary = synthesize(&input).unwrap();
    assert!(summary.additional_notes.ends_with("NKDA."));

    input.allergies = "None reported".to_string();
    let summary = synthesize(&input).unwrap();
    assert!(summary.additional_notes.ends_with("NKDA."));

    input.allergies = "Penicillin".to_string();
    input.consultation_type = ConsultationType::Audio;
    assert_eq!(
        synthesize(&input).unwrap().additional_notes,
        "Summary generated from audio consultation. Known allergies: Penicillin."
    );
}

#[test]
fn narrative_fields_are_trimmed() {
    let input = ConsultationInput {
        chief_complaint: "  Cough  ".to_string(),
        current_medications: "\nSalbutamol\n".to_string(),
        ..notes("stomach upset")
    };
    let summary = synthesize(&input).unwrap();
    assert!(summary.symptoms_presented.starts_with("Cough "));
    assert_eq!(summary.medications_prescribed, "Salbutamol");
}

#[test]
fn follow_up_uses_configured_timeframe() {
    let config = SummaryConfig {
        follow_up_timeframe: "4 weeks".to_string(),
        ..SummaryConfig::default()
    };
    let report = analyze(&notes("cough"), &config).unwrap();
    assert!(report.summary.follow_up_required);
    assert_eq!(report.summary.follow_up_timeframe, "4 weeks");

    let summary = synthesize(&notes("cough")).unwrap();
    assert_eq!(summary.follow_up_timeframe, "2 weeks");
}
