const WIDTH: usize = 0x10;

/// One row of a dump, or a marker for repeated rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Line<'a> {
    Data { offset: usize, data: &'a [u8] },
    Repeated,
}

pub fn printable(chr: u8) -> Option<char> {
    if (0x20..0x7f).contains(&chr) {
        Some(chr as char)
    } else {
        None
    }
}

impl<'a> std::fmt::Display for Line<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (offset, data) = match self {
            Self::Data { offset, data } => (offset, data),
            Self::Repeated => return write!(f, "*"),
        };

        write!(f, "{:04x}", offset)?;
        if data.is_empty() {
            return Ok(());
        }

        for i in 0..WIDTH {
            if i % 8 == 0 {
                write!(f, " ")?;
            }
            match data.get(i) {
                Some(b) => write!(f, " {:02x}", b)?,
                None => write!(f, "   ")?,
            }
        }

        write!(f, "  |")?;
        for b in data.iter() {
            write!(f, "{}", printable(*b).unwrap_or('.'))?;
        }
        write!(f, "|")
    }
}

/// Rows of a dump, collapsing runs of identical rows and ending with
/// the total length.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    rows: std::iter::Enumerate<std::slice::Chunks<'a, u8>>,
    len: usize,
    last: Option<&'a [u8]>,
    repeating: bool,
    done: bool,
}

impl<'a> Lines<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            rows: data.chunks(WIDTH).enumerate(),
            len: data.len(),
            last: None,
            repeating: false,
            done: false,
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for (i, row) in self.rows.by_ref() {
            if self.last == Some(row) {
                if !self.repeating {
                    self.repeating = true;
                    return Some(Line::Repeated);
                }
                continue;
            }
            self.last = Some(row);
            self.repeating = false;
            return Some(Line::Data {
                offset: i * WIDTH,
                data: row,
            });
        }

        if self.done {
            return None;
        }
        self.done = true;
        Some(Line::Data {
            offset: self.len,
            data: &[],
        })
    }
}

pub fn hexdump_prefix(prefix: &str, data: &[u8]) {
    for line in Lines::new(data) {
        println!("{}{}", prefix, line);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rows() {
        let mut data = b"IL2P".to_vec();
        data.extend([0; 60]);
        let lines: Vec<String> = Lines::new(&data).map(|l| l.to_string()).collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("0000  49 4c 32 50 00"));
        assert!(lines[0].ends_with("|IL2P............|"));
        assert!(lines[1].starts_with("0010  00"));
        assert_eq!(lines[2], "*");
        assert_eq!(lines[3], "0040");
    }

    #[test]
    fn empty() {
        let lines: Vec<String> = Lines::new(&[]).map(|l| l.to_string()).collect();
        assert_eq!(lines, ["0000"]);
    }
}
