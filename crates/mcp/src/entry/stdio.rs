#![forbid(unsafe_code)]

use super::framing::{
    TransportMode, detect_mode_from_first_line, parse_request, read_content_length_frame,
    write_response,
};
use crate::{SessionLog, SidebarServer};
use std::io::{BufRead, BufReader};

pub(crate) fn run_stdio(
    server: &mut SidebarServer,
    log: &mut SessionLog,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();

    // The framing style is sniffed from the first non-blank line and then
    // pinned for the rest of the session; replies always match requests.
    let mut mode: Option<TransportMode> = None;

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }

        let effective_mode = match mode {
            Some(v) => v,
            None => {
                let Some(detected) = detect_mode_from_first_line(&line) else {
                    continue;
                };
                log.note_mode(detected.as_str(), &line);
                mode = Some(detected);
                detected
            }
        };

        let body = match effective_mode {
            TransportMode::NewlineJson => {
                let raw = line.trim();
                if raw.is_empty() {
                    continue;
                }
                raw.as_bytes().to_vec()
            }
            TransportMode::ContentLength => {
                if line.trim().is_empty() {
                    continue;
                }
                let Some(body) = read_content_length_frame(&mut reader, line)? else {
                    break;
                };
                body
            }
        };

        let request = match parse_request(&body) {
            Ok(request) => request,
            Err(resp) => {
                log.note_error("malformed request frame");
                write_response(&mut stdout, effective_mode, &resp)?;
                continue;
            }
        };

        log.note_method(&request.method);
        if let Some(resp) = server.handle(request) {
            write_response(&mut stdout, effective_mode, &resp)?;
        }
    }

    log.note_exit("stdin eof");
    Ok(())
}
