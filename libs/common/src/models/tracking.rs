//! Daily check-ins and wearable samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Calm,
    Stressed,
    Motivated,
    Low,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Calm,
        Mood::Stressed,
        Mood::Motivated,
        Mood::Low,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Calm => "Calm",
            Mood::Stressed => "Stressed",
            Mood::Motivated => "Motivated",
            Mood::Low => "Low",
            Mood::Neutral => "Neutral",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == s)
            .ok_or_else(|| format!("unknown mood '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepQuality {
    Poor,
    Okay,
    Good,
}

impl SleepQuality {
    pub const ALL: [SleepQuality; 3] = [SleepQuality::Poor, SleepQuality::Okay, SleepQuality::Good];

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepQuality::Poor => "Poor",
            SleepQuality::Okay => "Okay",
            SleepQuality::Good => "Good",
        }
    }
}

impl FromStr for SleepQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SleepQuality::ALL
            .into_iter()
            .find(|quality| quality.as_str() == s)
            .ok_or_else(|| format!("unknown sleep quality '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityIntensity {
    Low,
    Moderate,
    High,
}

impl ActivityIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityIntensity::Low => "Low",
            ActivityIntensity::Moderate => "Moderate",
            ActivityIntensity::High => "High",
        }
    }
}

impl FromStr for ActivityIntensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(ActivityIntensity::Low),
            "Moderate" => Ok(ActivityIntensity::Moderate),
            "High" => Ok(ActivityIntensity::High),
            other => Err(format!("unknown activity intensity '{}'", other)),
        }
    }
}

/// Daily check-in entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub energy_level: i16,
    pub mood: Mood,
    pub sleep_quality: SleepQuality,
    pub date: DateTime<Utc>,
    /// Insertion sequence, breaks ties between equal timestamps
    #[serde(skip)]
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

/// Check-in submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCheckIn {
    pub energy_level: i16,
    pub mood: Mood,
    pub sleep_quality: SleepQuality,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl NewCheckIn {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.energy_level) {
            return Err("energyLevel must be between 1 and 5".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepStages {
    #[serde(default)]
    pub deep: Option<f64>,
    #[serde(default)]
    pub light: Option<f64>,
    #[serde(default)]
    pub rem: Option<f64>,
}

/// Wearable sensor snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WearableSample {
    pub id: Uuid,
    pub user_id: Uuid,
    pub step_count: Option<i64>,
    pub resting_heart_rate: Option<i32>,
    pub sleep_stages: SleepStages,
    pub activity_intensity: Option<ActivityIntensity>,
    pub recorded_at: DateTime<Utc>,
    /// Insertion sequence, breaks ties between equal timestamps
    #[serde(skip)]
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

/// Wearable sample submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWearableSample {
    #[serde(default)]
    pub step_count: Option<i64>,
    #[serde(default)]
    pub resting_heart_rate: Option<i32>,
    #[serde(default)]
    pub sleep_stages: SleepStages,
    #[serde(default)]
    pub activity_intensity: Option<ActivityIntensity>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl NewWearableSample {
    pub fn validate(&self) -> Result<(), String> {
        if self.step_count.is_some_and(|steps| steps < 0) {
            return Err("stepCount must not be negative".to_string());
        }
        if self.resting_heart_rate.is_some_and(|bpm| bpm <= 0) {
            return Err("restingHeartRate must be positive".to_string());
        }
        let stages = [
            self.sleep_stages.deep,
            self.sleep_stages.light,
            self.sleep_stages.rem,
        ];
        if stages.iter().flatten().any(|minutes| *minutes < 0.0) {
            return Err("sleepStages values must not be negative".to_string());
        }
        Ok(())
    }
}
