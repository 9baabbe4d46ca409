use std::{time::{Instant, Duration}, fmt::Display, borrow::Cow};

/// Records named timestamps through one frame of processing
#[derive(Clone, Debug)]
pub struct TimeProfile {
    /// Start timestamp
    now: Instant,
    /// Named timestamps
    stamps: Vec<TimeProfileEntry>,
}

impl Default for TimeProfile {
    fn default() -> Self {
        Self {
            now: Instant::now(),
            stamps: Default::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct TimeProfileEntry {
    name: Cow<'static, str>,
    timestamp: Instant,
}

impl TimeProfile {
    /// Clear all records and restart the clock
    pub fn clear(&mut self) {
        self.stamps.clear();
        self.now = Instant::now();
    }

    /// Record a timestamp right now
    #[inline]
    pub fn stamp(&mut self, name: impl Into<Cow<'static, str>>) {
        self.stamps.push(TimeProfileEntry {
            name: name.into(),
            timestamp: Instant::now(),
        });
    }

    /// Names of the recorded stamps, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stamps.iter().map(|s| s.name.as_ref())
    }

    /// Duration from the start to the last recorded timestamp
    pub fn total_duration(&self) -> Duration {
        match self.stamps.last() {
            Some(last) => last.timestamp - self.now,
            None => Duration::ZERO,
        }
    }
}

impl Display for TimeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let max_name_length = self.stamps.iter()
            .map(|stamp| stamp.name.len())
            .max()
            .unwrap_or(0)
            .max(1);

        let total_time = self.total_duration().as_secs_f64();

        let mut last_time = self.now;
        for (i, stamp) in self.stamps.iter().enumerate() {
            let cumtime = stamp.timestamp - self.now;
            let parttime = stamp.timestamp - last_time;
            let percent = if total_time > 0. {
                100. * parttime.as_secs_f64() / total_time
            } else {
                0.
            };

            writeln!(f, "{:2} {:width$} {:12.6} ms {:12.6} ms {:3.0}%",
                i,
                stamp.name,
                parttime.as_secs_f64() * 1000.,
                cumtime.as_secs_f64() * 1000.,
                percent,
                width=max_name_length
            )?;

            last_time = stamp.timestamp;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::TimeProfile;

    #[test]
    fn empty_profile() {
        let tp = TimeProfile::default();
        assert_eq!(tp.total_duration(), Duration::ZERO);
        assert_eq!(tp.to_string(), "");
    }

    #[test]
    fn stamps_in_order() {
        let mut tp = TimeProfile::default();
        tp.stamp("grab");
        tp.stamp("detect");
        tp.stamp(format!("publish {}", 3));
        assert_eq!(tp.names().collect::<Vec<_>>(), ["grab", "detect", "publish 3"]);
        assert_eq!(tp.to_string().lines().count(), 3);

        tp.clear();
        assert_eq!(tp.names().count(), 0);
    }
}
