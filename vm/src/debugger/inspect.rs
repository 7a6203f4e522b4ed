//! Variable inspection: locating a value by its [`StorageClass`], formatting
//! it by [`TypeTag`], and the guarded pointer probe (§4.7).

use crate::debug_db::{Primitive, StorageClass, TypeTag, VariableLocation};
use crate::interpreter::host::HostEnv;
use crate::interpreter::Interpreter;

/// How many bytes a pointer/array dereference prints at most (§4.7: "up to
/// 24 or 32 bytes").
const MAX_DEREF_BYTES: usize = 32;

/// The result of probing a pointer before dereferencing it (§4.7: "use a
/// probe that returns a safety verdict").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerProbe {
    /// Falls inside the VM's stack buffer at a valid offset.
    InStack,
    /// Falls inside the loaded code image.
    InCode,
    /// No recognized region claims this address.
    Bad,
}

/// One formatted rendering of a variable's current value, ready for the
/// REPL to print as a single line (§4.7: "one line: name, location
/// classifier ... and value").
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub name: String,
    pub classifier: String,
    pub value: String,
}

fn primitive_byte_width(p: Primitive) -> usize {
    use Primitive::*;
    match p {
        U8 | I8 => 1,
        U16 | I16 => 2,
        U32 | I32 | F32 => 4,
        U64 | I64 | F64 => 8,
    }
}

fn format_scalar_bits(p: Primitive, bits: u64) -> String {
    use Primitive::*;
    match p {
        U8 => format!("{}", bits as u8),
        I8 => format!("{}", bits as u8 as i8),
        U16 => format!("{}", bits as u16),
        I16 => format!("{}", bits as u16 as i16),
        U32 => format!("{}", bits as u32),
        I32 => format!("{}", bits as u32 as i32),
        U64 => format!("{}", bits),
        I64 => format!("{}", bits as i64),
        F32 => format!("{}", f32::from_bits(bits as u32)),
        F64 => format!("{}", f64::from_bits(bits)),
    }
}

fn format_bytes_block(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ");
    let decimal: String = bytes.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(",");
    let ascii: String = bytes
        .iter()
        .take_while(|b| **b != 0)
        .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
        .collect();
    format!("hex=[{hex}] dec=[{decimal}] ascii=\"{ascii}\"")
}

fn classifier_label(storage: StorageClass, position: u64) -> String {
    match storage {
        StorageClass::InRegister => format!("register r{position}"),
        StorageClass::OnStack => format!("stack[sp-{position}]"),
        StorageClass::GlobalStackOffset => format!("stack+{position}"),
        StorageClass::CodeBaseOffset => format!("code+{position}"),
    }
}

impl<H: HostEnv> Interpreter<H> {
    /// Probe whether `address` is safe to dereference before doing so
    /// (§4.7: "a read is attempted only when the pointer falls in one of
    /// the recognized regions").
    pub fn probe_pointer(&self, address: u64) -> PointerProbe {
        let Ok(addr) = usize::try_from(address) else {
            return PointerProbe::Bad;
        };
        if addr < self.stack().len() {
            PointerProbe::InStack
        } else if addr < self.code_len() {
            PointerProbe::InCode
        } else {
            PointerProbe::Bad
        }
    }

    fn read_scalar_bits(&self, storage: StorageClass, position: u64, width: usize) -> Option<u64> {
        match storage {
            StorageClass::InRegister => {
                let reg = vm_asm::RegId::new(u8::try_from(position).ok()?).ok()?;
                Some(self.registers().raw_bits(reg))
            }
            StorageClass::OnStack => {
                let addr = self.stack().resolve(self.stack_pointer() as usize, position as i64, width).ok()?;
                self.stack().read_uint(addr, width).ok()
            }
            StorageClass::GlobalStackOffset => self.stack().read_uint(position as usize, width).ok(),
            StorageClass::CodeBaseOffset => {
                let idx = position as usize;
                self.code_window(idx, width)
            }
        }
    }

    fn code_window(&self, start: usize, width: usize) -> Option<u64> {
        let end = start.checked_add(width)?;
        let slice = self.code_bytes().get(start..end)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(slice);
        Some(u64::from_le_bytes(buf))
    }

    /// Render one variable descriptor into a printable line (§4.7).
    pub fn render_variable(&self, var: &VariableLocation) -> Rendered {
        let classifier = classifier_label(var.storage_class, var.position);

        let value = match var.type_tag {
            TypeTag::Scalar(p) => self
                .read_scalar_bits(var.storage_class, var.position, primitive_byte_width(p))
                .map(|bits| format_scalar_bits(p, bits))
                .unwrap_or_else(|| "<UNREADABLE>".to_string()),

            TypeTag::PointerToScalar(_) | TypeTag::ArrayOfScalar(_) => {
                let Some(address) = self.read_scalar_bits(var.storage_class, var.position, 8) else {
                    return Rendered {
                        name: var.name.clone(),
                        classifier,
                        value: "<UNREADABLE>".to_string(),
                    };
                };
                match self.probe_pointer(address) {
                    PointerProbe::Bad => "<BAD_PTR>".to_string(),
                    PointerProbe::InStack => {
                        let addr = address as usize;
                        let len = MAX_DEREF_BYTES.min(self.stack().len().saturating_sub(addr));
                        match self.stack().window(addr, len) {
                            Ok(bytes) => format_bytes_block(bytes),
                            Err(_) => "<BAD_PTR>".to_string(),
                        }
                    }
                    PointerProbe::InCode => {
                        let addr = address as usize;
                        let len = MAX_DEREF_BYTES.min(self.code_len().saturating_sub(addr));
                        match self.code_bytes().get(addr..addr + len) {
                            Some(bytes) => format_bytes_block(bytes),
                            None => "<BAD_PTR>".to_string(),
                        }
                    }
                }
            }

            TypeTag::Other => self
                .read_scalar_bits(var.storage_class, var.position, 8)
                .map(|bits| format!("0x{bits:016x}"))
                .unwrap_or_else(|| "<UNREADABLE>".to_string()),
        };

        Rendered {
            name: var.name.clone(),
            classifier,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_db::TypeTag;
    use crate::interpreter::host::DefaultHost;
    use crate::interpreter::StackConfig;
    use vm_asm::RegId;

    fn var(name: &str, storage: StorageClass, position: u64, type_tag: TypeTag) -> VariableLocation {
        VariableLocation {
            name: name.to_string(),
            type_tag,
            storage_class: storage,
            position,
            is_variable: true,
            is_const: false,
            is_static: false,
        }
    }

    #[test]
    fn renders_integer_register_scalar() {
        let mut vm = Interpreter::new(vec![], StackConfig::Default, DefaultHost::new());
        vm.registers_mut().set_int(RegId::new(0).unwrap(), 42);
        let rendered = vm.render_variable(&var("x", StorageClass::InRegister, 0, TypeTag::Scalar(Primitive::I64)));
        assert_eq!(rendered.value, "42");
        assert_eq!(rendered.classifier, "register r0");
    }

    #[test]
    fn bad_pointer_is_reported_not_dereferenced() {
        let vm = Interpreter::new(vec![], StackConfig::WithSize(64), DefaultHost::new());
        assert_eq!(vm.probe_pointer(1_000_000), PointerProbe::Bad);
    }

    #[test]
    fn pointer_into_stack_is_probed_safe() {
        let vm = Interpreter::new(vec![], StackConfig::WithSize(64), DefaultHost::new());
        assert_eq!(vm.probe_pointer(10), PointerProbe::InStack);
    }
}
