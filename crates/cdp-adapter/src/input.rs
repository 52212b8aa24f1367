//! `Input.dispatch*` payload builders.

use serde_json::{json, Value};

use crate::commands::ElementPoint;

pub(crate) fn mouse_move(point: ElementPoint) -> Value {
    json!({
        "type": "mouseMoved",
        "x": point.x,
        "y": point.y,
        "button": "none",
        "pointerType": "mouse",
    })
}

pub(crate) fn mouse_button(kind: &str, point: ElementPoint, click_count: u32) -> Value {
    json!({
        "type": kind,
        "x": point.x,
        "y": point.y,
        "button": "left",
        "buttons": if kind == "mousePressed" { 1 } else { 0 },
        "clickCount": click_count,
        "pointerType": "mouse",
    })
}

struct KeyDef {
    key: &'static str,
    code: &'static str,
    text: Option<&'static str>,
    virtual_key: i64,
}

fn named_key(key: &str) -> Option<KeyDef> {
    let def = match key {
        "Enter" => KeyDef {
            key: "Enter",
            code: "Enter",
            text: Some("\r"),
            virtual_key: 13,
        },
        "Tab" => KeyDef {
            key: "Tab",
            code: "Tab",
            text: Some("\t"),
            virtual_key: 9,
        },
        "Escape" => KeyDef {
            key: "Escape",
            code: "Escape",
            text: None,
            virtual_key: 27,
        },
        "Backspace" => KeyDef {
            key: "Backspace",
            code: "Backspace",
            text: None,
            virtual_key: 8,
        },
        "Delete" => KeyDef {
            key: "Delete",
            code: "Delete",
            text: None,
            virtual_key: 46,
        },
        "ArrowDown" => KeyDef {
            key: "ArrowDown",
            code: "ArrowDown",
            text: None,
            virtual_key: 40,
        },
        "ArrowUp" => KeyDef {
            key: "ArrowUp",
            code: "ArrowUp",
            text: None,
            virtual_key: 38,
        },
        _ => return None,
    };
    Some(def)
}

/// keyDown/keyUp pair for a named key such as `Backspace` or `Enter`.
pub(crate) fn named_key_events(key: &str) -> Option<(Value, Value)> {
    let def = named_key(key)?;
    let mut down = json!({
        "type": if def.text.is_some() { "keyDown" } else { "rawKeyDown" },
        "key": def.key,
        "code": def.code,
        "windowsVirtualKeyCode": def.virtual_key,
        "nativeVirtualKeyCode": def.virtual_key,
    });
    if let Some(text) = def.text {
        down["text"] = json!(text);
        down["unmodifiedText"] = json!(text);
    }
    let up = json!({
        "type": "keyUp",
        "key": def.key,
        "code": def.code,
        "windowsVirtualKeyCode": def.virtual_key,
        "nativeVirtualKeyCode": def.virtual_key,
    });
    Some((down, up))
}

/// keyDown/keyUp pair that inserts one printable character.
pub(crate) fn char_key_events(ch: char) -> (Value, Value) {
    if ch == '\n' {
        if let Some(events) = named_key_events("Enter") {
            return events;
        }
    }
    let text = ch.to_string();
    let down = json!({
        "type": "keyDown",
        "key": text,
        "text": text,
        "unmodifiedText": text,
    });
    let up = json!({
        "type": "keyUp",
        "key": text,
    });
    (down, up)
}
