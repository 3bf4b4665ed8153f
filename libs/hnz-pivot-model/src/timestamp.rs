//! Pivot Timestamp Codec
//!
//! The pivot model carries time as seconds since epoch plus a 24-bit binary
//! fraction of one second; the legacy protocol carries milliseconds. The two
//! conversions here are inverses only up to the rounding of the fraction, so
//! a millisecond round-trip is exact to within 1 ms.

use serde_json::Value;

use crate::error::Result;
use crate::tree::value_i64;

/// One second expressed in 24-bit fraction units (2^24).
const FRACTION_UNITS_PER_SECOND: i64 = 16_777_216;

/// Timestamp of a pivot object, with its clock-quality flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTimestamp {
    pub second_since_epoch: i64,
    pub fraction_of_second: i64,
    pub time_accuracy: i64,
    pub clock_failure: bool,
    pub leap_second_known: bool,
    pub clock_not_synchronized: bool,
}

impl PivotTimestamp {
    /// Parse a `t` attribute sub-tree.
    ///
    /// All children are optional; a node that is not a dictionary yields the
    /// default timestamp, matching the tolerance of the surrounding decode.
    pub fn parse(node: &Value) -> Result<Self> {
        let mut ts = PivotTimestamp::default();
        let Some(map) = node.as_object() else {
            return Ok(ts);
        };
        for (name, value) in map {
            match name.as_str() {
                "SecondSinceEpoch" => ts.second_since_epoch = value_i64(value, name)?,
                "FractionOfSecond" => ts.fraction_of_second = value_i64(value, name)?,
                "TimeQuality" => ts.parse_time_quality(value)?,
                _ => {}
            }
        }
        Ok(ts)
    }

    fn parse_time_quality(&mut self, node: &Value) -> Result<()> {
        let Some(map) = node.as_object() else {
            return Ok(());
        };
        for (name, value) in map {
            match name.as_str() {
                "clockFailure" => self.clock_failure = value_i64(value, name)? > 0,
                "clockNotSynchronized" => {
                    self.clock_not_synchronized = value_i64(value, name)? > 0;
                }
                "leapSecondKnown" => self.leap_second_known = value_i64(value, name)? > 0,
                "timeAccuracy" => self.time_accuracy = value_i64(value, name)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Millisecond timestamp of this instant, rounded from the fraction.
    pub fn epoch_ms(&self) -> i64 {
        to_epoch_ms(self.second_since_epoch, self.fraction_of_second)
    }
}

/// Combine seconds and a 24-bit second fraction into epoch milliseconds.
pub fn to_epoch_ms(second_since_epoch: i64, fraction_of_second: i64) -> i64 {
    let ms_part =
        ((fraction_of_second * 1000) as f64 / FRACTION_UNITS_PER_SECOND as f64).round() as i64;
    second_since_epoch * 1000 + ms_part
}

/// Split epoch milliseconds into seconds and a 24-bit second fraction.
pub fn from_epoch_ms(epoch_ms: i64) -> (i64, i64) {
    let remainder = epoch_ms % 1000;
    let fraction_of_second = remainder * 16_777 + (remainder * 216) / 1000;
    (epoch_ms / 1000, fraction_of_second)
}

/// Wall-clock milliseconds since epoch.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
