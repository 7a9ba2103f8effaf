//! Template pool for synthetic events.

use std::time::Duration;

use rand::Rng;

use crate::traffic_event::EventKind;

/// Bounded ranges a synthetic event of one kind is drawn from.
#[derive(Debug, Clone, Copy)]
pub struct EventTemplate {
    pub kind: EventKind,
    pub severity: (f64, f64),
    pub duration_mins: (u64, u64),
    pub radius_km: (f64, f64),
    pub descriptions: &'static [&'static str],
}

pub const TEMPLATES: &[EventTemplate] = &[
    EventTemplate {
        kind: EventKind::RoadClosure,
        severity: (0.8, 1.0),
        duration_mins: (30, 120),
        radius_km: (0.2, 0.5),
        descriptions: &["Road closed for emergency repairs", "Street closed by police"],
    },
    EventTemplate {
        kind: EventKind::Accident,
        severity: (0.4, 0.9),
        duration_mins: (15, 60),
        radius_km: (0.2, 0.4),
        descriptions: &["Multi-vehicle collision", "Vehicle breakdown blocking a lane"],
    },
    EventTemplate {
        kind: EventKind::HeavyTraffic,
        severity: (0.3, 0.8),
        duration_mins: (10, 45),
        radius_km: (0.3, 0.8),
        descriptions: &["Stop-and-go traffic", "Slow traffic near junction"],
    },
    EventTemplate {
        kind: EventKind::Construction,
        severity: (0.3, 0.7),
        duration_mins: (60, 240),
        radius_km: (0.1, 0.3),
        descriptions: &["Roadworks with lane shift", "Utility works"],
    },
    EventTemplate {
        kind: EventKind::Weather,
        severity: (0.2, 0.6),
        duration_mins: (30, 180),
        radius_km: (0.8, 2.0),
        descriptions: &["Heavy rain", "Dense fog"],
    },
    EventTemplate {
        kind: EventKind::PublicEvent,
        severity: (0.3, 0.7),
        duration_mins: (60, 240),
        radius_km: (0.3, 0.8),
        descriptions: &["Stadium event traffic", "Street festival"],
    },
    EventTemplate {
        kind: EventKind::Hazard,
        severity: (0.2, 0.6),
        duration_mins: (10, 60),
        radius_km: (0.1, 0.3),
        descriptions: &["Debris on road", "Oil spill"],
    },
    EventTemplate {
        kind: EventKind::LaneRestriction,
        severity: (0.2, 0.5),
        duration_mins: (30, 120),
        radius_km: (0.1, 0.3),
        descriptions: &["Right lane closed", "Single lane traffic"],
    },
    EventTemplate {
        kind: EventKind::PoliceActivity,
        severity: (0.3, 0.7),
        duration_mins: (15, 60),
        radius_km: (0.1, 0.4),
        descriptions: &["Police checkpoint", "Police activity ahead"],
    },
    EventTemplate {
        kind: EventKind::Flooding,
        severity: (0.5, 1.0),
        duration_mins: (60, 240),
        radius_km: (0.3, 0.8),
        descriptions: &["Flooded underpass", "Standing water on road"],
    },
];

pub fn template_for(kind: EventKind) -> Option<&'static EventTemplate> {
    TEMPLATES.iter().find(|t| t.kind == kind)
}

/// Uniform in `[lo, hi]`; `lo` when the range is empty.
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

impl EventTemplate {
    pub fn sample_severity<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        uniform(rng, self.severity.0, self.severity.1)
    }

    pub fn sample_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = self.duration_mins;
        let mins = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
        Duration::from_secs(mins * 60)
    }

    pub fn sample_radius_km<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        uniform(rng, self.radius_km.0, self.radius_km.1)
    }

    pub fn sample_description<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static str {
        if self.descriptions.is_empty() {
            return self.kind.label();
        }
        self.descriptions[rng.gen_range(0..self.descriptions.len())]
    }
}
