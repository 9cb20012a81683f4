//! Event-stream processing for conversation responses.
//!
//! The conversation endpoint answers with newline-delimited `data:` lines,
//! each carrying the cumulative reply so far as JSON.  This module converts
//! raw byte streams into structured [`Reply`] values, buffering across chunk
//! boundaries and skipping the noise the backend interleaves: blank lines,
//! the `[DONE]` sentinel, and payloads without text parts.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::{Error, Reply, Result, ServerReply};

/// The prefix carrying event payloads.
pub(crate) const DATA_PREFIX: &str = "data: ";

/// The sentinel marking the end of a streamed reply.
const DONE_SENTINEL: &str = "[DONE]";

/// Process a stream of bytes into a stream of reply events.
///
/// Transport and encoding failures surface as `Err` items; lines that do
/// not parse as replies are dropped silently, matching how the endpoint
/// mixes bookkeeping lines into its output.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use futures::StreamExt;
///
/// # tokio_test::block_on(async {
/// let body = concat!(
///     "data: {\"message\": {\"id\": \"m1\", \"content\": ",
///     "{\"content_type\": \"text\", \"parts\": [\"Hello.\"]}}, ",
///     "\"conversation_id\": \"c1\"}\n",
///     "data: [DONE]\n",
/// );
/// let bytes = Box::pin(futures::stream::once(async move {
///     Ok::<_, reqwest::Error>(Bytes::from(body))
/// }));
///
/// let mut events = Box::pin(geppetto::sse::reply_events(bytes));
/// let reply = events.next().await.unwrap().unwrap();
/// assert_eq!(reply.text, "Hello.");
/// assert_eq!(reply.conversation_id, "c1");
/// assert!(events.next().await.is_none());
/// # })
/// ```
pub fn reply_events<S>(byte_stream: S) -> impl Stream<Item = Result<Reply>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    // Use a state machine to process the line stream
    let buffer = Vec::new();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                // First drain any complete lines in the buffer
                while let Some(line) = take_line(&mut buffer) {
                    match line.map(|line| parse_data_line(&line)) {
                        Ok(Some(reply)) => return Some((Ok(reply), (stream, buffer))),
                        Ok(None) => {}
                        Err(err) => return Some((Err(err), (stream, buffer))),
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // End of stream; flush a final unterminated line.
                        let line = std::mem::take(&mut buffer);
                        if line.is_empty() {
                            return None;
                        }
                        return match decode_line(line) {
                            Ok(line) => {
                                parse_data_line(&line).map(|reply| (Ok(reply), (stream, buffer)))
                            }
                            Err(err) => Some((Err(err), (stream, buffer))),
                        };
                    }
                }
            }
        },
    )
}

/// Split one decoded, newline-terminated line off the front of the
/// buffer.  Lines are cut before decoding: a multibyte character can be
/// split across chunks, but never across a newline.
fn take_line(buffer: &mut Vec<u8>) -> Option<Result<String>> {
    let newline = buffer.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=newline).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(decode_line(line))
}

/// Decode one complete line of bytes.
fn decode_line(line: Vec<u8>) -> Result<String> {
    String::from_utf8(line).map_err(|e| {
        Error::encoding(format!("Invalid UTF-8 in stream: {e}"), Some(Box::new(e)))
    })
}

/// Parse one line into a reply, or `None` for anything else.
pub(crate) fn parse_data_line(line: &str) -> Option<Reply> {
    let data = line.trim().strip_prefix(DATA_PREFIX)?;
    if data == DONE_SENTINEL {
        return None;
    }
    let reply: ServerReply = serde_json::from_str(data).ok()?;
    reply.into_reply()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn data_line(text: &str, message_id: &str) -> String {
        format!(
            "data: {{\"message\": {{\"id\": \"{message_id}\", \"content\": {{\"content_type\": \"text\", \"parts\": [\"{text}\"]}}}}, \"conversation_id\": \"c1\"}}\n"
        )
    }

    #[tokio::test]
    async fn parse_reply_event() {
        let data = data_line("Hello.", "m1");
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut events = Box::pin(reply_events(stream));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.text, "Hello.");
        assert_eq!(event.conversation_id, "c1");
        assert_eq!(event.message_id, "m1");

        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn cumulative_events_in_order() {
        let data = format!("{}{}", data_line("Hel", "m1"), data_line("Hello.", "m1"));
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut events = Box::pin(reply_events(stream));
        assert_eq!(events.next().await.unwrap().unwrap().text, "Hel");
        assert_eq!(events.next().await.unwrap().unwrap().text, "Hello.");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn noise_lines_are_skipped() {
        let data = format!(
            "\nevent: ping\n{}not json\ndata: {{\"nope\": true}}\ndata: [DONE]\n",
            data_line("Hello.", "m1"),
        );
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut events = Box::pin(reply_events(stream));
        assert_eq!(events.next().await.unwrap().unwrap().text, "Hello.");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn partless_payloads_are_skipped() {
        let data = format!(
            "data: {{\"message\": {{\"id\": \"m0\", \"content\": {{\"content_type\": \"text\", \"parts\": []}}}}, \"conversation_id\": \"c1\"}}\n{}",
            data_line("Hello.", "m1"),
        );
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut events = Box::pin(reply_events(stream));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.message_id, "m1");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_split_event() {
        // Simulate a line split across multiple chunks
        let line = data_line("Hello.", "m1");
        let (chunk1, chunk2) = line.split_at(20);
        let chunk1 = Bytes::from(chunk1.to_string());
        let chunk2 = Bytes::from(chunk2.to_string());

        let stream = Box::pin(stream::iter(vec![Ok(chunk1), Ok(chunk2)]));

        let mut events = Box::pin(reply_events(stream));
        assert_eq!(events.next().await.unwrap().unwrap().text, "Hello.");
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        // Cut between the two bytes of the 'é'.
        let line = data_line("Héllo.", "m1");
        let split = line.find('é').unwrap() + 1;
        let bytes = line.into_bytes();
        let (chunk1, chunk2) = bytes.split_at(split);
        let stream = Box::pin(stream::iter(vec![
            Ok(Bytes::copy_from_slice(chunk1)),
            Ok(Bytes::copy_from_slice(chunk2)),
        ]));

        let mut events = Box::pin(reply_events(stream));
        assert_eq!(events.next().await.unwrap().unwrap().text, "Héllo.");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_the_stream() {
        let mut data = b"data: \xff\xfe\n".to_vec();
        data.extend_from_slice(data_line("Hello.", "m1").as_bytes());
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut events = Box::pin(reply_events(stream));
        let err = events.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
        assert_eq!(events.next().await.unwrap().unwrap().text, "Hello.");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn flush_unterminated_final_line() {
        let line = data_line("Hello.", "m1");
        let line = line.trim_end().to_string();
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(line)) }));

        let mut events = Box::pin(reply_events(stream));
        assert_eq!(events.next().await.unwrap().unwrap().text, "Hello.");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_error() {
        let stream = Box::pin(stream::once(async {
            Ok(Bytes::from_static(&[0xff, 0xfe, 0xfd]))
        }));

        let mut events = Box::pin(reply_events(stream));
        let event = events.next().await.unwrap();
        assert!(event.is_err());
    }

    #[test]
    fn parse_data_line_cases() {
        assert!(parse_data_line("data: [DONE]").is_none());
        assert!(parse_data_line("").is_none());
        assert!(parse_data_line("data: {broken").is_none());
        assert!(parse_data_line("ping").is_none());

        let line = data_line("Hi", "m1");
        let reply = parse_data_line(line.trim_end()).unwrap();
        assert_eq!(reply.text, "Hi");
    }
}
