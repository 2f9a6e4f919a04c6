//! Help and welcome texts, plus the `$b`/`$i`/`$u`/`$r` markup they are written in.

const BOLD: char = '\x02';
const ITALIC: char = '\x1d';
const UNDERLINE: char = '\x1f';
const RESET: char = '\x0f';

const HELP_TEXT: &str = "$bNotetaker Help$r

  $bHELP$r                - This text
  $bNEW [password]$r      - Create a new note, setting a password on the channel.
                        The password must be a single word.
                        On creation of this channel, you will be invited and further help
                        text will be given (which is also included below).


$iThe following commands only work for sessions you created$r


  $bSAVE [session_id]$r   - Save this note to a gist, returning the gist URL
  $bCLOSE [session_id]$r  - Save this note, return the gist, then close the notetaker session.
                        Closing the session means that notetaker will leave the
                        channel and never come back. You will then be able to close it or delete it.";

/// Convert markup to IRC formatting control codes.
///
/// Unknown escapes are kept verbatim; `$$` is a literal dollar sign.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let code = match chars.peek() {
            Some('b') => BOLD,
            Some('i') => ITALIC,
            Some('u') => UNDERLINE,
            Some('r') => RESET,
            Some('$') => '$',
            _ => {
                out.push('$');
                continue;
            }
        };
        chars.next();
        out.push(code);
    }

    out
}

/// Help text, one IRC message per entry.
pub fn help_lines() -> Vec<String> {
    HELP_TEXT.lines().map(unescape).collect()
}

/// Text posted into a freshly created session channel.
pub fn welcome_lines(nick: &str, id: &str) -> Vec<String> {
    [
        "$bWelcome to Notetaker Session$r".to_string(),
        "Useful commands:".to_string(),
        format!("  $b/MSG {nick} save {id}$r   - Save these notes. Returns a gist URL"),
        format!("  $b/MSG {nick} close {id}$r  - Save these notes, then boot the notetaker bot"),
        format!("(the ID of this channel is $b$u\"{id}\"$r)"),
    ]
    .iter()
    .map(|line| unescape(line))
    .collect()
}

/// Topic of a session channel.
pub fn session_topic(nick: &str, id: &str) -> String {
    format!("/MSG {nick} save {id}")
}

/// Reply carrying the link to saved notes.
pub fn gist_location(url: &str) -> String {
    format!("gist location: {url}")
}
