use std::fmt;

#[derive(Debug, Default)]
pub struct Msg(Box<[u8]>);

impl Msg {
    pub fn inner(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn display(&self) -> Displayable<'_> {
        Displayable(self.0.as_ref())
    }

    pub fn new_sysex(data: &[u8]) -> Self {
        use super::sysex;

        let mut buf = Vec::with_capacity(data.len() + 2);

        buf.push(sysex::TAG);
        buf.extend(data);
        buf.push(sysex::END_TAG);

        Self(buf.into())
    }
}

impl<const S: usize> From<[u8; S]> for Msg {
    fn from(buf: [u8; S]) -> Self {
        Self(buf.into())
    }
}

impl From<&[u8]> for Msg {
    fn from(buf: &[u8]) -> Self {
        Self(buf.into())
    }
}

impl From<Vec<u8>> for Msg {
    fn from(buf: Vec<u8>) -> Self {
        Self(buf.into())
    }
}

impl std::ops::Deref for Msg {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[derive(Debug)]
pub struct Displayable<'a>(&'a [u8]);

impl<'a> From<&'a [u8]> for Displayable<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Self(buf)
    }
}

impl<'a> fmt::Display for Displayable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();

        match iter.next() {
            Some(first) => write!(f, "(hex): {first:02x}")?,
            None => return Ok(()),
        };

        for val in iter {
            write!(f, ", {val:02x}")?;
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MsgList(Vec<Msg>);

impl MsgList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, msg: impl Into<Msg>) {
        self.0.push(msg.into())
    }
}

impl IntoIterator for MsgList {
    type Item = Msg;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Into<Msg>> From<T> for MsgList {
    fn from(msg: T) -> Self {
        Self(vec![msg.into()])
    }
}
