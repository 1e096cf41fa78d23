//! Local volume clamp for the target device

use audio_device::VolumeControl;

/// What the clamp did to the master level
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClampOutcome {
    /// Master was already at or below the cap
    Unchanged { level: f32 },
    /// Master was lowered to the cap
    Reduced { from: f32, to: f32 },
}

/// Unify all channels to the master level, then cap the master level
///
/// Channels mirror the master level as it was before capping.
pub fn clamp_volume(volume: &dyn VolumeControl, cap: f32) -> audio_device::Result<ClampOutcome> {
    let master = volume.master_level()?;
    for channel in 0..volume.channel_count()? {
        volume.set_channel_level(channel, master)?;
    }

    if master > cap {
        volume.set_master_level(cap)?;
        Ok(ClampOutcome::Reduced {
            from: master,
            to: cap,
        })
    } else {
        Ok(ClampOutcome::Unchanged { level: master })
    }
}
