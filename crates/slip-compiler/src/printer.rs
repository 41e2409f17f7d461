//! Human-readable listings of compiled code.

use slip_core::{Heap, Instr, Instruction, Item, Sequence, Value};

/// Columns per nesting level.
const INDENT: usize = 8;

/// Width of each instruction field.
const FIELD: usize = 8;

/// Render `code` as an indented listing.
///
/// Labels print flush left and the following instruction continues on the
/// same line. Closure bodies are nested one level deeper under their `FN`.
pub fn show(heap: &Heap, code: &Sequence) -> String {
    let mut lines = Vec::new();
    show_level(heap, code, 1, &mut lines);
    lines.join("\n")
}

fn show_level(heap: &Heap, code: &Sequence, level: usize, lines: &mut Vec<String>) {
    let mut labels: Option<String> = None;
    for item in code.items() {
        let instr = match item {
            Item::Label(label) => {
                let prefix = labels.get_or_insert_with(String::new);
                prefix.push_str(&format!("{:<width$}", format!("{}:", label), width = level * INDENT));
                continue;
            }
            Item::Instr(instr) => instr,
        };

        let mut line = labels.take().unwrap_or_else(|| " ".repeat(level * INDENT));
        if let Instr::Fn(body) = instr {
            line.push_str(instr.op().name());
            lines.push(line.trim_end().to_string());
            show_level(heap, body, level + 1, lines);
            continue;
        }
        for field in fields(heap, instr) {
            line.push_str(&format!("{:<FIELD$}", field));
        }
        lines.push(line.trim_end().to_string());
    }
    if let Some(dangling) = labels {
        lines.push(dangling.trim_end().to_string());
    }
}

/// The opcode name followed by serialized operands.
fn fields(heap: &Heap, instr: &Instruction) -> Vec<String> {
    let mut out = vec![instr.op().name().to_string()];
    match instr {
        Instr::Const(value) => out.push(heap.serialize(value)),
        Instr::LVar { frame, slot } | Instr::LSet { frame, slot } => {
            out.push(frame.to_string());
            out.push(slot.to_string());
        }
        Instr::GVar(sym) | Instr::GSet(sym) => out.push(heap.serialize(&Value::Symbol(*sym))),
        Instr::Jump(label) | Instr::TJump(label) | Instr::FJump(label) | Instr::Save(label) => {
            out.push(label.to_string())
        }
        Instr::Call(n) | Instr::Args(n) | Instr::ArgsRest(n) => out.push(n.to_string()),
        Instr::Prim(sym, n) => {
            out.push(heap.serialize(&Value::Symbol(*sym)));
            out.push(n.to_string());
        }
        Instr::Pop | Instr::Ret | Instr::Cc | Instr::Fn(_) => {}
    }
    out
}
