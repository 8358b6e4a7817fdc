//! Profile facets: the per-user onboarding documents
//!
//! Each facet is stored as one JSON document keyed by `(user_id, kind)`.
//! The typed structs below validate what callers send; only the fields a
//! caller actually provided are serialized, so an upsert overwrites exactly
//! those fields and leaves the rest of the stored document alone.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::str::FromStr;
use uuid::Uuid;

/// Which facet a stored document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Profile,
    SleepRoutine,
    Mobility,
    TaskPreference,
    FemaleCycle,
    MaleEnergy,
}

impl FacetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Profile => "profile",
            FacetKind::SleepRoutine => "sleep_routine",
            FacetKind::Mobility => "mobility",
            FacetKind::TaskPreference => "task_preference",
            FacetKind::FemaleCycle => "female_cycle",
            FacetKind::MaleEnergy => "male_energy",
        }
    }
}

impl FromStr for FacetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(FacetKind::Profile),
            "sleep_routine" => Ok(FacetKind::SleepRoutine),
            "mobility" => Ok(FacetKind::Mobility),
            "task_preference" => Ok(FacetKind::TaskPreference),
            "female_cycle" => Ok(FacetKind::FemaleCycle),
            "male_energy" => Ok(FacetKind::MaleEnergy),
            other => Err(format!("unknown facet kind '{}'", other)),
        }
    }
}

/// A stored facet document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetRecord {
    pub user_id: Uuid,
    pub kind: FacetKind,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FacetRecord {
    /// The document returned to clients: facet fields plus ownership and timestamps
    pub fn to_document(&self) -> Value {
        let mut document = match &self.data {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        document.insert("userId".to_string(), json!(self.user_id));
        document.insert("createdAt".to_string(), json!(self.created_at));
        document.insert("updatedAt".to_string(), json!(self.updated_at));
        Value::Object(document)
    }
}

/// Shallow merge of `patch` into `base`, the way a field-level `$set` behaves
pub fn merge_documents(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key.clone(), value.clone());
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// A typed facet payload
pub trait Facet: Serialize + DeserializeOwned + Send {
    const KIND: FacetKind;

    /// Check ranges and normalize sets in place
    fn validate(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Fields written only when the document is first created
    fn defaults() -> Value {
        json!({})
    }
}

fn dedupe<T: PartialEq>(values: &mut Vec<T>) {
    let mut index = 0;
    while index < values.len() {
        if values[..index].contains(&values[index]) {
            values.remove(index);
        } else {
            index += 1;
        }
    }
}

fn validate_clock(label: &str, value: &Option<String>) -> Result<(), String> {
    if let Some(value) = value {
        NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|_| format!("{} must be formatted as HH:MM", label))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "18-25")]
    From18To25,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "36-45")]
    From36To45,
    #[serde(rename = "46+")]
    From46,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiologicalSex {
    Male,
    Female,
    #[serde(rename = "Prefer not to say")]
    Undisclosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccupationType {
    Student,
    #[serde(rename = "Desk Job")]
    DeskJob,
    #[serde(rename = "Field Work")]
    FieldWork,
    #[serde(rename = "Shift Based")]
    ShiftBased,
    Freelancer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    Productivity,
    Balance,
    Health,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Core profile (onboarding step 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub age_range: AgeRange,
    pub biological_sex: BiologicalSex,
    pub occupation_type: OccupationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<Goal>>,
}

impl Facet for UserProfile {
    const KIND: FacetKind = FacetKind::Profile;

    fn validate(&mut self) -> Result<(), String> {
        if let Some(hours) = &self.working_hours {
            validate_clock("workingHours.start", &hours.start)?;
            validate_clock("workingHours.end", &hours.end)?;
        }
        if let Some(goals) = self.goals.as_mut() {
            dedupe(goals);
        }
        Ok(())
    }

    fn defaults() -> Value {
        json!({ "goals": [Goal::Productivity] })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepConsistency {
    Fixed,
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakAlertTime {
    Morning,
    Afternoon,
    Night,
}

/// Sleep routine (onboarding step 2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRoutine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_sleep_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_consistency: Option<SleepConsistency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_alert_time: Option<PeakAlertTime>,
}

impl Facet for SleepRoutine {
    const KIND: FacetKind = FacetKind::SleepRoutine;

    fn validate(&mut self) -> Result<(), String> {
        match self.average_sleep_hours {
            Some(hours) if !(3.0..=12.0).contains(&hours) => {
                Err("averageSleepHours must be between 3 and 12".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelMode {
    Walk,
    Bike,
    #[serde(rename = "Public Transport")]
    PublicTransport,
    Cab,
    #[serde(rename = "Work From Home")]
    WorkFromHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Commute and rest-day profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobilityProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_commute_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<TravelMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_travel_fatigue: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_rest_days: Option<Vec<RestDay>>,
}

impl Facet for MobilityProfile {
    const KIND: FacetKind = FacetKind::Mobility;

    fn validate(&mut self) -> Result<(), String> {
        if let Some(days) = self.preferred_rest_days.as_mut() {
            dedupe(days);
        }
        Ok(())
    }

    fn defaults() -> Value {
        json!({ "postTravelFatigue": false })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "Deep Focus")]
    DeepFocus,
    Creative,
    Social,
    Physical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskFlexibility {
    Fixed,
    Reschedulable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakPreference {
    Short,
    Long,
    None,
}

/// Task preferences (onboarding step 3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_task_types: Option<Vec<TaskType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_flexibility: Option<TaskFlexibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_preference: Option<BreakPreference>,
}

impl Facet for TaskPreference {
    const KIND: FacetKind = FacetKind::TaskPreference;

    fn validate(&mut self) -> Result<(), String> {
        if let Some(types) = self.preferred_task_types.as_mut() {
            dedupe(types);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symptom {
    Fatigue,
    Cramps,
    #[serde(rename = "Brain Fog")]
    BrainFog,
    #[serde(rename = "High Energy")]
    HighEnergy,
}

/// Menstrual cycle facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FemaleCycle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cycle_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<Vec<Symptom>>,
}

impl Facet for FemaleCycle {
    const KIND: FacetKind = FacetKind::FemaleCycle;

    fn validate(&mut self) -> Result<(), String> {
        if let Some(length) = self.average_cycle_length {
            if !(1..=60).contains(&length) {
                return Err("averageCycleLength must be between 1 and 60".to_string());
            }
        }
        if let Some(symptoms) = self.symptoms.as_mut() {
            dedupe(symptoms);
        }
        Ok(())
    }

    fn defaults() -> Value {
        json!({ "averageCycleLength": 28 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutFrequency {
    None,
    #[serde(rename = "1-2/week")]
    OneToTwoPerWeek,
    #[serde(rename = "3-5/week")]
    ThreeToFivePerWeek,
    Daily,
}

/// Daily energy pattern facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaleEnergyPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_level: Option<StressLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_frequency: Option<WorkoutFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_crash_time: Option<String>,
}

impl Facet for MaleEnergyPattern {
    const KIND: FacetKind = FacetKind::MaleEnergy;
}

/// Selector sent alongside the sex-specific facet fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiologicalType {
    Female,
    Male,
}

impl BiologicalType {
    pub fn kind(&self) -> FacetKind {
        match self {
            BiologicalType::Female => FacetKind::FemaleCycle,
            BiologicalType::Male => FacetKind::MaleEnergy,
        }
    }

    /// The facet that must not coexist with this one
    pub fn other_kind(&self) -> FacetKind {
        match self {
            BiologicalType::Female => FacetKind::MaleEnergy,
            BiologicalType::Male => FacetKind::FemaleCycle,
        }
    }
}
