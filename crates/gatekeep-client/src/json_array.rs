//! Incremental decoding of a top-level JSON array.
//!
//! Elements are split out of the byte stream as soon as their closing `,` or
//! `]` arrives and decoded one by one. `null` elements are skipped. A `null`
//! or empty body is an empty array.

use std::io;

use futures::stream::{self, Stream, StreamExt};
use serde::de::{DeserializeOwned, Error as _};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the opening `[`.
    Start,
    /// After `[` or `,`, waiting for an element or `]`.
    Between,
    /// Inside an element.
    Element,
    /// After the closing `]` or a top-level `null`.
    Done,
}

#[derive(Debug)]
enum Scan {
    Element(Vec<u8>),
    NeedMore,
    End,
}

/// Splits array elements out of a growing buffer.
#[derive(Debug)]
struct ArrayScanner {
    buffer: Vec<u8>,
    pos: usize,
    state: State,
    element_start: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ArrayScanner {
    const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            pos: 0,
            state: State::Start,
            element_start: 0,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn next_element(&mut self) -> Result<Scan, serde_json::Error> {
        while let Some(&byte) = self.buffer.get(self.pos) {
            match self.state {
                State::Done => return Ok(Scan::End),
                State::Start => {
                    if byte.is_ascii_whitespace() {
                        self.pos += 1;
                    } else if byte == b'[' {
                        self.pos += 1;
                        self.state = State::Between;
                    } else {
                        return self.top_level_null();
                    }
                }
                State::Between => {
                    if byte.is_ascii_whitespace() {
                        self.pos += 1;
                    } else if byte == b']' {
                        self.state = State::Done;
                    } else {
                        self.state = State::Element;
                        self.element_start = self.pos;
                        self.depth = 0;
                    }
                }
                State::Element => {
                    self.pos += 1;
                    if self.in_string {
                        if self.escaped {
                            self.escaped = false;
                        } else if byte == b'\\' {
                            self.escaped = true;
                        } else if byte == b'"' {
                            self.in_string = false;
                        }
                        continue;
                    }

                    match byte {
                        b'"' => self.in_string = true,
                        b'{' | b'[' => self.depth += 1,
                        b',' | b']' if self.depth == 0 => {
                            return Ok(Scan::Element(self.take_element(byte)));
                        }
                        b'}' | b']' => self.depth = self.depth.saturating_sub(1),
                        _ => {}
                    }
                }
            }
        }

        if self.state == State::Done {
            Ok(Scan::End)
        } else {
            Ok(Scan::NeedMore)
        }
    }

    /// Cuts the element ending just before the delimiter at `pos - 1`.
    fn take_element(&mut self, delimiter: u8) -> Vec<u8> {
        let end = self.pos - 1;
        let element = self.buffer[self.element_start..end].to_vec();
        self.buffer.drain(..self.pos);
        self.pos = 0;
        self.state = if delimiter == b']' {
            State::Done
        } else {
            State::Between
        };
        element
    }

    fn top_level_null(&mut self) -> Result<Scan, serde_json::Error> {
        let rest = &self.buffer[self.pos..];
        if rest.starts_with(b"null") {
            self.state = State::Done;
            Ok(Scan::End)
        } else if b"null".starts_with(rest) {
            Ok(Scan::NeedMore)
        } else {
            Err(serde_json::Error::custom("expected a JSON array"))
        }
    }

    /// Checks that the body did not stop in the middle of the array.
    fn finish(&self) -> Result<(), serde_json::Error> {
        match self.state {
            State::Done => Ok(()),
            State::Start if self.buffer[self.pos..].iter().all(u8::is_ascii_whitespace) => Ok(()),
            _ => Err(serde_json::Error::io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "JSON array ended before its closing bracket",
            ))),
        }
    }
}

/// Decodes the elements of a JSON array arriving as byte chunks.
///
/// Stops after the first error.
pub fn elements<S, B, T>(chunks: S) -> impl Stream<Item = Result<T, ClientError>>
where
    S: Stream<Item = reqwest::Result<B>>,
    B: AsRef<[u8]>,
    T: DeserializeOwned,
{
    let state = Some((Box::pin(chunks), ArrayScanner::new()));

    stream::unfold(state, |state| async move {
        let (mut chunks, mut scanner) = state?;
        loop {
            match scanner.next_element() {
                Ok(Scan::Element(raw)) => match serde_json::from_slice::<Option<T>>(&raw) {
                    Ok(Some(item)) => return Some((Ok(item), Some((chunks, scanner)))),
                    Ok(None) => continue,
                    Err(e) => return Some((Err(e.into()), None)),
                },
                Ok(Scan::End) => return None,
                Ok(Scan::NeedMore) => {}
                Err(e) => return Some((Err(e.into()), None)),
            }

            match chunks.next().await {
                Some(Ok(chunk)) => scanner.feed(chunk.as_ref()),
                Some(Err(e)) => return Some((Err(e.into()), None)),
                None => {
                    return scanner
                        .finish()
                        .err()
                        .map(|e| (Err(e.into()), None));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    async fn decode<T: DeserializeOwned>(chunks: &[&'static str]) -> Vec<Result<T, ClientError>> {
        let chunks = chunks
            .iter()
            .map(|c| Ok::<_, reqwest::Error>(c.as_bytes()))
            .collect::<Vec<_>>();
        elements(stream::iter(chunks)).collect().await
    }

    #[tokio::test]
    async fn test_elements_split_across_chunks() {
        let items = decode::<Item>(&[
            "  [{\"id\": 1, \"na",
            "me\": \"a]b,c\"}, null,",
            " {\"id\": 2, \"name\": \"say \\\"hi\\\" [x]\"}",
            "]",
        ])
        .await;

        let items: Vec<Item> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            items,
            vec![
                Item {
                    id: 1,
                    name: "a]b,c".to_string()
                },
                Item {
                    id: 2,
                    name: "say \"hi\" [x]".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_scalars_and_nested_arrays() {
        let numbers = decode::<u32>(&["[1, 2", "3 ,4]"]).await;
        let numbers: Vec<u32> = numbers.into_iter().map(Result::unwrap).collect();
        assert_eq!(numbers, vec![1, 23, 4]);

        let nested = decode::<Vec<u8>>(&["[[1,2],[],[3]]"]).await;
        let nested: Vec<Vec<u8>> = nested.into_iter().map(Result::unwrap).collect();
        assert_eq!(nested, vec![vec![1, 2], vec![], vec![3]]);
    }

    #[tokio::test]
    async fn test_empty_bodies() {
        assert!(decode::<u32>(&["[]"]).await.is_empty());
        assert!(decode::<u32>(&[" [ ] "]).await.is_empty());
        assert!(decode::<u32>(&["nu", "ll"]).await.is_empty());
        assert!(decode::<u32>(&[""]).await.is_empty());
        assert!(decode::<u32>(&[]).await.is_empty());
        assert!(decode::<u32>(&["[null, null]"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_not_an_array() {
        let results = decode::<u32>(&["{\"id\": 1}"]).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ClientError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_truncated_array() {
        let results = decode::<u32>(&["[1, 2"]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(matches!(results[1], Err(ClientError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_stops_at_first_bad_element() {
        let results = decode::<u32>(&["[1, \"two\", 3]"]).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
