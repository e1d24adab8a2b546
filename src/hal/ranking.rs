use serde::{Deserialize, Serialize};

use super::types::{FormatDescriptor, FormatFlags};

/// Highest channel count a candidate may carry
pub const MAX_CHANNELS: u32 = 64;

/// Minimum physical frame width (bytes) when packed bytes are forced
pub const PACKED_BYTES_THRESHOLD: u32 = 6;

/// Target format plus the policy switches for one negotiation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegotiationRequest {
    pub format: FormatDescriptor,
    /// Candidates must agree with `format` on the non-mixable flag
    pub prefer_non_mixable: bool,
    /// Rank on physical frame width against the fixed threshold instead of bit depth
    pub force_packed_bytes: bool,
}

impl NegotiationRequest {
    pub fn new(format: FormatDescriptor) -> Self {
        Self {
            format,
            prefer_non_mixable: false,
            force_packed_bytes: false,
        }
    }

    pub fn prefer_non_mixable(mut self, enabled: bool) -> Self {
        self.prefer_non_mixable = enabled;
        self
    }

    pub fn force_packed_bytes(mut self, enabled: bool) -> Self {
        self.force_packed_bytes = enabled;
        self
    }
}

/// Whether `new` is an improvement over `old` for the `requested` value.
///
/// Meeting the request beats falling short. Among values at or above the
/// request the smallest wins; below it the largest wins. Equal values
/// prefer `new` so that later criteria get to decide.
pub fn value_is_better(requested: f64, old: f64, new: f64) -> bool {
    if new >= requested {
        old < requested || new <= old
    } else {
        old < requested && new >= old
    }
}

/// Whether `new` should replace `old` as the best match for `requested`,
/// with the default channel limit and frame-width threshold.
pub fn is_better(
    requested: &FormatDescriptor,
    old: &FormatDescriptor,
    new: &FormatDescriptor,
    prefer_non_mixable: bool,
    force_packed_bytes: bool,
) -> bool {
    FormatRanker::default().is_better(requested, old, new, prefer_non_mixable, force_packed_bytes)
}

/// Best candidate for `request` among device-advertised formats
pub fn select_best<'a, I>(request: &NegotiationRequest, candidates: I) -> Option<FormatDescriptor>
where
    I: IntoIterator<Item = &'a FormatDescriptor>,
{
    FormatRanker::default().select_best(request, candidates)
}

/// Ranking engine with configurable limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRanker {
    pub max_channels: u32,
    pub packed_byte_threshold: u32,
}

impl Default for FormatRanker {
    fn default() -> Self {
        Self {
            max_channels: MAX_CHANNELS,
            packed_byte_threshold: PACKED_BYTES_THRESHOLD,
        }
    }
}

impl FormatRanker {
    pub fn new(max_channels: u32, packed_byte_threshold: u32) -> Self {
        Self {
            max_channels,
            packed_byte_threshold,
        }
    }

    pub fn is_better(
        &self,
        requested: &FormatDescriptor,
        old: &FormatDescriptor,
        new: &FormatDescriptor,
        prefer_non_mixable: bool,
        force_packed_bytes: bool,
    ) -> bool {
        if new.channels_per_frame > self.max_channels {
            return false;
        }
        if old.channels_per_frame > self.max_channels {
            return true;
        }
        if new.kind() != requested.kind() {
            return false;
        }
        if old.kind() != requested.kind() {
            return true;
        }

        let width_ok = if force_packed_bytes {
            value_is_better(
                self.packed_byte_threshold as f64,
                old.bytes_per_frame as f64,
                new.bytes_per_frame as f64,
            )
        } else {
            value_is_better(
                requested.bits_per_channel as f64,
                old.bits_per_channel as f64,
                new.bits_per_channel as f64,
            )
        };
        if !width_ok {
            return false;
        }

        if prefer_non_mixable {
            let wanted = requested.flags & FormatFlags::NON_MIXABLE;
            if new.flags & FormatFlags::NON_MIXABLE != wanted {
                return false;
            }
            if old.flags & FormatFlags::NON_MIXABLE != wanted {
                return true;
            }
        }

        if !value_is_better(requested.sample_rate, old.sample_rate, new.sample_rate) {
            return false;
        }

        value_is_better(
            requested.channels_per_frame as f64,
            old.channels_per_frame as f64,
            new.channels_per_frame as f64,
        )
    }

    /// Fold [`FormatRanker::is_better`] over `candidates`.
    ///
    /// The first candidate within the channel limit and of the requested
    /// kind seeds the incumbent. `None` when no candidate qualifies.
    pub fn select_best<'a, I>(
        &self,
        request: &NegotiationRequest,
        candidates: I,
    ) -> Option<FormatDescriptor>
    where
        I: IntoIterator<Item = &'a FormatDescriptor>,
    {
        let requested = &request.format;
        let mut best: Option<FormatDescriptor> = None;

        for candidate in candidates {
            match &best {
                None => {
                    if candidate.channels_per_frame <= self.max_channels
                        && candidate.kind() == requested.kind()
                    {
                        best = Some(*candidate);
                    }
                }
                Some(incumbent) => {
                    if self.is_better(
                        requested,
                        incumbent,
                        candidate,
                        request.prefer_non_mixable,
                        request.force_packed_bytes,
                    ) {
                        best = Some(*candidate);
                    }
                }
            }
        }

        best
    }
}
