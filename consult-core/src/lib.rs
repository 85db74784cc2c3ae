//! Mô hình dữ liệu dùng chung cho việc tổng hợp tóm tắt buổi khám từ xa.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Cấu hình các hằng số dùng khi tổng hợp tóm tắt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryConfig {
    /// Khoảng thời gian tái khám ghi vào mọi bản tóm tắt.
    pub follow_up_timeframe: String,
    /// Số ký tự ghi chú bác sĩ lấy làm triệu chứng khi không nhận diện được bệnh cảnh.
    pub symptom_excerpt_chars: usize,
    /// Số ký tự ghi chú bác sĩ chép vào kế hoạch điều trị ở nhánh dự phòng.
    pub plan_excerpt_chars: usize,
}

impl SummaryConfig {
    /// Kiểm tra cấu hình trước khi dùng.
    pub fn validate(&self) -> Result<(), SummaryError> {
        Timeframe::parse(&self.follow_up_timeframe).map(|_| ())
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            follow_up_timeframe: "2 weeks".to_string(),
            symptom_excerpt_chars: 200,
            plan_excerpt_chars: 300,
        }
    }
}

/// Hình thức buổi khám.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationType {
    #[default]
    Video,
    Audio,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationType::Video => "video",
            ConsultationType::Audio => "audio",
        }
    }
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsultationType {
    type Err = SummaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "video" => Ok(ConsultationType::Video),
            "audio" => Ok(ConsultationType::Audio),
            other => Err(SummaryError::Parse(format!(
                "unknown consultation type `{other}`"
            ))),
        }
    }
}

/// Dữ liệu buổi khám do portal gửi lên.
///
/// Trường văn bản rỗng được hiểu là "không có giá trị"; `null` và trường thiếu
/// đều được chuẩn hoá về chuỗi rỗng.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationInput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub doctor_notes: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub patient_name: String,
    #[serde(default, deserialize_with = "age_as_text")]
    pub patient_age: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub patient_gender: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub chief_complaint: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub current_symptoms: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub current_medications: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allergies: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub medical_history: String,
    #[serde(default, deserialize_with = "consultation_type_or_default")]
    pub consultation_type: ConsultationType,
}

impl ConsultationInput {
    /// Khởi tạo nhanh chỉ với ghi chú bác sĩ.
    pub fn from_notes(notes: impl Into<String>) -> Self {
        Self {
            doctor_notes: notes.into(),
            ..Self::default()
        }
    }

    /// Kiểm tra điều kiện tối thiểu trước khi tổng hợp.
    pub fn validate(&self) -> Result<(), SummaryError> {
        if self.doctor_notes.trim().is_empty() {
            return Err(SummaryError::InvalidInput(
                "doctorNotes is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn chief_complaint(&self) -> Option<&str> {
        non_empty(&self.chief_complaint)
    }

    pub fn current_symptoms(&self) -> Option<&str> {
        non_empty(&self.current_symptoms)
    }

    pub fn current_medications(&self) -> Option<&str> {
        non_empty(&self.current_medications)
    }

    pub fn allergies(&self) -> Option<&str> {
        non_empty(&self.allergies)
    }
}

/// Bản tóm tắt có cấu trúc trả về cho bên gọi.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuredSummary {
    pub diagnosis: String,
    pub symptoms_presented: String,
    pub examination_findings: String,
    pub treatment_plan: String,
    pub medications_prescribed: String,
    pub lifestyle_recommendations: String,
    pub patient_education: String,
    pub follow_up_required: bool,
    pub follow_up_notes: String,
    pub follow_up_timeframe: String,
    pub referral_required: bool,
    pub referral_specialty: String,
    pub referral_notes: String,
    pub red_flags: String,
    pub additional_notes: String,
}

impl StructuredSummary {
    /// Suy ra lịch tái khám từ bản tóm tắt, tính từ ngày khám.
    pub fn follow_up_plan(
        &self,
        consulted_on: NaiveDate,
    ) -> Result<Option<FollowUpPlan>, SummaryError> {
        if !self.follow_up_required {
            return Ok(None);
        }

        let timeframe = Timeframe::parse(&self.follow_up_timeframe)?;
        let due_on = timeframe
            .add_to(consulted_on)
            .ok_or_else(|| SummaryError::InvalidTimeframe(self.follow_up_timeframe.clone()))?;

        Ok(Some(FollowUpPlan {
            due_on,
            notes: self.follow_up_notes.clone(),
        }))
    }
}

/// Lịch tái khám để bên gọi lưu thành nhắc hẹn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowUpPlan {
    pub due_on: NaiveDate,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timeframe {
    Days(u64),
    Weeks(u64),
    Months(u32),
}

impl Timeframe {
    fn parse(raw: &str) -> Result<Self, SummaryError> {
        let invalid = || SummaryError::InvalidTimeframe(raw.to_string());
        let mut parts = raw.split_whitespace();
        let amount = parts.next().ok_or_else(invalid)?;
        let unit = parts.next().ok_or_else(invalid)?.to_lowercase();
        if parts.next().is_some() {
            return Err(invalid());
        }

        let amount: u32 = amount.parse().map_err(|_| invalid())?;
        match unit.as_str() {
            "day" | "days" => Ok(Timeframe::Days(u64::from(amount))),
            "week" | "weeks" => Ok(Timeframe::Weeks(u64::from(amount))),
            "month" | "months" => Ok(Timeframe::Months(amount)),
            _ => Err(invalid()),
        }
    }

    fn add_to(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Timeframe::Days(days) => date.checked_add_days(Days::new(days)),
            Timeframe::Weeks(weeks) => date.checked_add_days(Days::new(weeks.checked_mul(7)?)),
            Timeframe::Months(months) => date.checked_add_months(Months::new(months)),
        }
    }
}

/// Lỗi chung khi tổng hợp tóm tắt.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Dữ liệu đầu vào không hợp lệ: {0}")]
    InvalidInput(String),
    #[error("Khoảng thời gian tái khám không hợp lệ: {0}")]
    InvalidTimeframe(String),
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn age_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AgeValue {
        Text(String),
        Whole(i64),
        Decimal(f64),
    }

    Ok(match Option::<AgeValue>::deserialize(deserializer)? {
        Some(AgeValue::Text(text)) => text,
        Some(AgeValue::Whole(age)) => age.to_string(),
        Some(AgeValue::Decimal(age)) => age.to_string(),
        None => String::new(),
    })
}

fn consultation_type_or_default<'de, D>(deserializer: D) -> Result<ConsultationType, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => raw.parse().map_err(serde::de::Error::custom),
        None => Ok(ConsultationType::default()),
    }
}
