//! Cầu nối WASM <-> JavaScript cho các portal bác sĩ chạy trên trình duyệt.

use consult_core::{ConsultationInput, SummaryConfig, SummaryError};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsSummaryConfig {
    #[serde(default)]
    follow_up_timeframe: Option<String>,
    #[serde(default)]
    symptom_excerpt_chars: Option<usize>,
    #[serde(default)]
    plan_excerpt_chars: Option<usize>,
}

impl From<JsSummaryConfig> for SummaryConfig {
    fn from(cfg: JsSummaryConfig) -> Self {
        let mut base = SummaryConfig::default();
        if let Some(timeframe) = cfg.follow_up_timeframe {
            base.follow_up_timeframe = timeframe;
        }
        if let Some(chars) = cfg.symptom_excerpt_chars {
            base.symptom_excerpt_chars = chars;
        }
        if let Some(chars) = cfg.plan_excerpt_chars {
            base.plan_excerpt_chars = chars;
        }
        base
    }
}

#[wasm_bindgen]
pub fn generate_summary(input: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let payload = from_value::<serde_json::Value>(input)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON buổi khám: {err}")))?;
    let consultation: ConsultationInput = serde_json::from_value(payload)
        .map_err(|err| JsValue::from_str(&format!("Sai định dạng buổi khám: {err}")))?;

    let js_cfg = match config {
        Some(js_cfg) => {
            let cfg: JsSummaryConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            Some(cfg)
        }
        None => None,
    };
    let cfg = resolve_config(js_cfg)
        .map_err(|err| JsValue::from_str(&format_summary_error(err)))?;

    let summary = consult_synth::synthesize_with_config(&consultation, &cfg)
        .map_err(|err| JsValue::from_str(&format_summary_error(err)))?;

    to_value(&summary)
        .map_err(|err| JsValue::from_str(&format!("Không serialize được bản tóm tắt: {err}")))
}

/// Trộn config từ JS vào giá trị mặc định rồi kiểm tra trước khi tổng hợp.
fn resolve_config(cfg: Option<JsSummaryConfig>) -> Result<SummaryConfig, SummaryError> {
    let cfg = cfg.map(SummaryConfig::from).unwrap_or_default();
    cfg.validate()?;
    Ok(cfg)
}

fn format_summary_error(err: SummaryError) -> String {
    format!("Summary error: {err}")
}
