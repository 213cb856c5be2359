//! DMX channel storage
//!
//! Channels are numbered from 1 as on a lighting desk; storage is indexed
//! from 0. Writes past the reserved size are ignored.

/// Channel buffer of one DMX link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxUniverse {
    channels: Vec<u8>,
}

impl DmxUniverse {
    /// Reserve `size` channels, all at zero
    #[must_use]
    pub fn new(size: u16) -> Self {
        Self {
            channels: vec![0; usize::from(size)],
        }
    }

    /// Number of reserved channels
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Value of 1-based `channel`, or `None` outside the reserved range
    #[inline]
    #[must_use]
    pub fn get(&self, channel: u16) -> Option<u8> {
        let index = usize::from(channel).checked_sub(1)?;
        self.channels.get(index).copied()
    }

    /// Set the channel at 0-based `index`.
    ///
    /// Returns `false`, leaving the universe unchanged, when `index` is not
    /// reserved.
    pub fn set_index(&mut self, index: usize, value: u8) -> bool {
        match self.channels.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Zero every channel
    pub fn clear(&mut self) {
        self.channels.fill(0);
    }

    /// Raw channel data, channel 1 first
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.channels
    }

    /// `(channel, value)` for every channel above zero
    pub fn active_channels(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0)
            .filter_map(|(index, value)| Some((u16::try_from(index + 1).ok()?, *value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let universe = DmxUniverse::new(16);
        assert_eq!(universe.len(), 16);
        assert!(universe.as_slice().iter().all(|v| *v == 0));
    }

    #[test]
    fn channels_are_one_based() {
        let mut universe = DmxUniverse::new(4);
        assert!(universe.set_index(0, 10));
        assert_eq!(universe.get(1), Some(10));
        assert_eq!(universe.get(0), None);
        assert_eq!(universe.get(5), None);
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let mut universe = DmxUniverse::new(2);
        assert!(!universe.set_index(2, 99));
        assert_eq!(universe.as_slice(), &[0, 0]);
    }

    #[test]
    fn active_channels_skips_zero() {
        let mut universe = DmxUniverse::new(5);
        universe.set_index(1, 7);
        universe.set_index(4, 255);
        let active: Vec<_> = universe.active_channels().collect();
        assert_eq!(active, vec![(2, 7), (5, 255)]);

        universe.clear();
        assert_eq!(universe.active_channels().count(), 0);
    }
}
