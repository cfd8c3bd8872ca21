//! Finding frame markers in a raw capture.

use nom::bytes::complete::take_until;
use nom::IResult;

/// One entry in the boundary list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Boundary {
    /// A marker starts at this offset.
    At(usize),
    /// End of capture. Always the last entry.
    End,
}

impl Boundary {
    /// Resolve into an offset within a buffer of this length.
    pub fn position(&self, capture_len: usize) -> usize {
        match self {
            Self::At(o) => *o,
            Self::End => capture_len,
        }
    }
}

/// The bytes after one marker, up to the next marker or end of capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameSpan {
    /// Frame number within the capture.
    pub index: usize,
    /// Offset of the marker.
    pub offset: usize,
    pub start: usize,
    pub end: usize,
}

impl FrameSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, capture: &'a [u8]) -> &'a [u8] {
        &capture[self.start..self.end]
    }
}

fn find(haystack: &[u8], marker: &[u8]) -> Option<usize> {
    let found: IResult<&[u8], &[u8]> = take_until(marker)(haystack);
    found.ok().map(|(_, before)| before.len())
}

/// Every occurrence of `marker`, in increasing order, then
/// [Boundary::End].
///
/// After a match the search resumes one byte past the match start, so
/// overlapping occurrences are all reported.
pub fn locate_markers(capture: &[u8], marker: &[u8]) -> Vec<Boundary> {
    let mut boundaries = Vec::new();
    if !marker.is_empty() {
        let mut from = 0;
        while let Some(rel) = find(&capture[from..], marker) {
            let at = from + rel;
            log::trace!("marker at {}", at);
            boundaries.push(Boundary::At(at));
            from = at + 1;
            if from >= capture.len() {
                break;
            }
        }
    }
    boundaries.push(Boundary::End);
    boundaries
}

/// Pair consecutive boundaries into frame spans.
///
/// A frame whose next marker starts before its own marker ends comes
/// back as an empty span.
pub fn frame_spans<'a>(
    boundaries: &'a [Boundary],
    marker_len: usize,
    capture_len: usize,
) -> impl Iterator<Item = FrameSpan> + 'a {
    boundaries
        .windows(2)
        .enumerate()
        .filter_map(move |(index, pair)| match pair[0] {
            Boundary::At(offset) => {
                let start = (offset + marker_len).min(capture_len);
                let end = pair[1].position(capture_len).max(start);
                Some(FrameSpan {
                    index,
                    offset,
                    start,
                    end,
                })
            }
            Boundary::End => None,
        })
}

#[cfg(test)]
mod test {
    use super::*;

    use quickcheck_macros::quickcheck;

    const MARKER: [u8; 4] = [0xaa, 0xf1, 0x5e, 0x48];

    #[test]
    fn no_markers() {
        assert_eq!(locate_markers(b"nothing here", &MARKER), [Boundary::End]);
        assert_eq!(locate_markers(&[], &MARKER), [Boundary::End]);
        assert_eq!(frame_spans(&[Boundary::End], 4, 0).count(), 0);
    }

    #[test]
    fn finds_all() {
        let mut capture = vec![0x00, 0x01];
        capture.extend(MARKER);
        capture.extend([0x10; 6]);
        capture.extend(MARKER);
        capture.extend([0x20; 3]);

        let boundaries = locate_markers(&capture, &MARKER);
        assert_eq!(
            boundaries,
            [Boundary::At(2), Boundary::At(12), Boundary::End]
        );

        let spans: Vec<_> = frame_spans(&boundaries, 4, capture.len()).collect();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].slice(&capture), [0x10; 6]);
        assert_eq!(spans[0].offset, 2);
        assert_eq!(spans[1].slice(&capture), [0x20; 3]);
        assert_eq!(spans[1].index, 1);
    }

    #[test]
    fn overlapping_markers() {
        let boundaries = locate_markers(b"xAAAAy", b"AAA");
        assert_eq!(
            boundaries,
            [Boundary::At(1), Boundary::At(2), Boundary::End]
        );

        let spans: Vec<_> = frame_spans(&boundaries, 3, 6).collect();
        assert!(spans[0].is_empty());
        assert_eq!(spans[1].slice(b"xAAAAy"), b"y");
    }

    #[test]
    fn marker_at_end() {
        let boundaries = locate_markers(&MARKER, &MARKER);
        assert_eq!(boundaries, [Boundary::At(0), Boundary::End]);
        let spans: Vec<_> = frame_spans(&boundaries, 4, 4).collect();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_empty());
    }

    #[quickcheck]
    fn offsets_increase_and_match(capture: Vec<u8>, seeds: Vec<u8>) -> bool {
        // plant markers at a few arbitrary places
        let mut capture = capture;
        for s in seeds {
            let at = s as usize % (capture.len() + 1);
            capture.splice(at..at, MARKER);
        }

        let boundaries = locate_markers(&capture, &MARKER);
        let offsets: Vec<usize> = boundaries
            .iter()
            .filter_map(|b| match b {
                Boundary::At(o) => Some(*o),
                Boundary::End => None,
            })
            .collect();
        let expected: Vec<usize> = capture
            .windows(4)
            .enumerate()
            .filter(|(_, w)| *w == MARKER)
            .map(|(i, _)| i)
            .collect();

        boundaries.last() == Some(&Boundary::End)
            && offsets == expected
            && frame_spans(&boundaries, 4, capture.len()).count() == offsets.len()
    }
}
