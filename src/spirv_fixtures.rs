//! Hand-assembled SPIR-V modules for reflection and program tests
//!
//! Each fixture is a minimal but valid SPIR-V 1.0 module with an empty
//! `main` whose declared interface (uniform blocks, sampled images,
//! vertex inputs) is what the tests assert against. Instructions are
//! emitted in the logical layout the SPIR-V spec requires:
//! capabilities, memory model, entry points, execution modes, debug
//! names, annotations, types/variables, functions.

const MAGIC: u32 = 0x0723_0203;
const VERSION_1_0: u32 = 0x0001_0000;

// Opcodes
const OP_NAME: u32 = 5;
const OP_MEMORY_MODEL: u32 = 14;
const OP_ENTRY_POINT: u32 = 15;
const OP_EXECUTION_MODE: u32 = 16;
const OP_CAPABILITY: u32 = 17;
const OP_TYPE_VOID: u32 = 19;
const OP_TYPE_FLOAT: u32 = 22;
const OP_TYPE_VECTOR: u32 = 23;
const OP_TYPE_IMAGE: u32 = 25;
const OP_TYPE_SAMPLED_IMAGE: u32 = 27;
const OP_TYPE_STRUCT: u32 = 30;
const OP_TYPE_POINTER: u32 = 32;
const OP_TYPE_FUNCTION: u32 = 33;
const OP_FUNCTION: u32 = 54;
const OP_FUNCTION_END: u32 = 56;
const OP_VARIABLE: u32 = 59;
const OP_DECORATE: u32 = 71;
const OP_MEMBER_DECORATE: u32 = 72;
const OP_LABEL: u32 = 248;
const OP_RETURN: u32 = 253;

// Enums
const CAP_SHADER: u32 = 1;
const ADDRESSING_LOGICAL: u32 = 0;
const MEMORY_GLSL450: u32 = 1;
const EXEC_MODEL_VERTEX: u32 = 0;
const EXEC_MODEL_FRAGMENT: u32 = 4;
const EXEC_MODEL_GLCOMPUTE: u32 = 5;
const EXEC_MODE_ORIGIN_UPPER_LEFT: u32 = 7;
const EXEC_MODE_LOCAL_SIZE: u32 = 17;
const SC_UNIFORM_CONSTANT: u32 = 0;
const SC_INPUT: u32 = 1;
const SC_UNIFORM: u32 = 2;
const DEC_BLOCK: u32 = 2;
const DEC_LOCATION: u32 = 30;
const DEC_BINDING: u32 = 33;
const DEC_DESCRIPTOR_SET: u32 = 34;
const DEC_OFFSET: u32 = 35;
const DIM_2D: u32 = 1;
const IMAGE_FORMAT_UNKNOWN: u32 = 0;
const FUNCTION_CONTROL_NONE: u32 = 0;

struct ModuleBuilder {
    words: Vec<u32>,
    next_id: u32,
}

impl ModuleBuilder {
    fn new() -> Self {
        Self {
            words: Vec::new(),
            next_id: 1,
        }
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn op(&mut self, opcode: u32, operands: &[u32]) {
        self.words.push(((operands.len() as u32 + 1) << 16) | opcode);
        self.words.extend_from_slice(operands);
    }

    /// Emit an instruction with an embedded literal string
    fn op_str(&mut self, opcode: u32, before: &[u32], text: &str, after: &[u32]) {
        let string_words = encode_string(text);
        let word_count = 1 + before.len() + string_words.len() + after.len();
        self.words.push(((word_count as u32) << 16) | opcode);
        self.words.extend_from_slice(before);
        self.words.extend_from_slice(&string_words);
        self.words.extend_from_slice(after);
    }

    fn build(self) -> Vec<u32> {
        let mut module = vec![MAGIC, VERSION_1_0, 0, self.next_id, 0];
        module.extend(self.words);
        module
    }
}

/// Null-terminated, word-padded UTF-8 literal
fn encode_string(text: &str) -> Vec<u32> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Append the empty `void main()` body
fn emit_main(b: &mut ModuleBuilder, void_ty: u32, fn_ty: u32, main_fn: u32, label: u32) {
    b.op(OP_FUNCTION, &[void_ty, main_fn, FUNCTION_CONTROL_NONE, fn_ty]);
    b.op(OP_LABEL, &[label]);
    b.op(OP_RETURN, &[]);
    b.op(OP_FUNCTION_END, &[]);
}

/// Vertex stage: uniform block `Transform` (four vec4 members, 64
/// bytes, set 0 binding 0) and inputs `inPosition` (vec3, location 0)
/// and `inUV0` (vec2, location 1).
pub fn vertex_transform() -> Vec<u32> {
    let mut b = ModuleBuilder::new();
    let main_fn = b.id();
    let f32_ty = b.id();
    let vec2_ty = b.id();
    let vec3_ty = b.id();
    let vec4_ty = b.id();
    let block_ty = b.id();
    let block_ptr = b.id();
    let block_var = b.id();
    let pos_ptr = b.id();
    let pos_var = b.id();
    let uv_ptr = b.id();
    let uv_var = b.id();
    let void_ty = b.id();
    let fn_ty = b.id();
    let label = b.id();

    b.op(OP_CAPABILITY, &[CAP_SHADER]);
    b.op(OP_MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450]);
    b.op_str(
        OP_ENTRY_POINT,
        &[EXEC_MODEL_VERTEX, main_fn],
        "main",
        &[pos_var, uv_var],
    );
    b.op_str(OP_NAME, &[block_ty], "Transform", &[]);
    b.op_str(OP_NAME, &[block_var], "Transform", &[]);
    b.op_str(OP_NAME, &[pos_var], "inPosition", &[]);
    b.op_str(OP_NAME, &[uv_var], "inUV0", &[]);
    b.op(OP_DECORATE, &[block_ty, DEC_BLOCK]);
    b.op(OP_MEMBER_DECORATE, &[block_ty, 0, DEC_OFFSET, 0]);
    b.op(OP_MEMBER_DECORATE, &[block_ty, 1, DEC_OFFSET, 16]);
    b.op(OP_MEMBER_DECORATE, &[block_ty, 2, DEC_OFFSET, 32]);
    b.op(OP_MEMBER_DECORATE, &[block_ty, 3, DEC_OFFSET, 48]);
    b.op(OP_DECORATE, &[block_var, DEC_DESCRIPTOR_SET, 0]);
    b.op(OP_DECORATE, &[block_var, DEC_BINDING, 0]);
    b.op(OP_DECORATE, &[pos_var, DEC_LOCATION, 0]);
    b.op(OP_DECORATE, &[uv_var, DEC_LOCATION, 1]);
    b.op(OP_TYPE_FLOAT, &[f32_ty, 32]);
    b.op(OP_TYPE_VECTOR, &[vec2_ty, f32_ty, 2]);
    b.op(OP_TYPE_VECTOR, &[vec3_ty, f32_ty, 3]);
    b.op(OP_TYPE_VECTOR, &[vec4_ty, f32_ty, 4]);
    b.op(
        OP_TYPE_STRUCT,
        &[block_ty, vec4_ty, vec4_ty, vec4_ty, vec4_ty],
    );
    b.op(OP_TYPE_POINTER, &[block_ptr, SC_UNIFORM, block_ty]);
    b.op(OP_VARIABLE, &[block_ptr, block_var, SC_UNIFORM]);
    b.op(OP_TYPE_POINTER, &[pos_ptr, SC_INPUT, vec3_ty]);
    b.op(OP_VARIABLE, &[pos_ptr, pos_var, SC_INPUT]);
    b.op(OP_TYPE_POINTER, &[uv_ptr, SC_INPUT, vec2_ty]);
    b.op(OP_VARIABLE, &[uv_ptr, uv_var, SC_INPUT]);
    b.op(OP_TYPE_VOID, &[void_ty]);
    b.op(OP_TYPE_FUNCTION, &[fn_ty, void_ty]);
    emit_main(&mut b, void_ty, fn_ty, main_fn, label);
    b.build()
}

/// Fragment stage: combined image sampler `AlbedoMap` (set 0, binding 1)
pub fn fragment_albedo() -> Vec<u32> {
    let mut b = ModuleBuilder::new();
    let main_fn = b.id();
    let f32_ty = b.id();
    let image_ty = b.id();
    let sampled_ty = b.id();
    let sampled_ptr = b.id();
    let sampled_var = b.id();
    let void_ty = b.id();
    let fn_ty = b.id();
    let label = b.id();

    b.op(OP_CAPABILITY, &[CAP_SHADER]);
    b.op(OP_MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450]);
    b.op_str(OP_ENTRY_POINT, &[EXEC_MODEL_FRAGMENT, main_fn], "main", &[]);
    b.op(
        OP_EXECUTION_MODE,
        &[main_fn, EXEC_MODE_ORIGIN_UPPER_LEFT],
    );
    b.op_str(OP_NAME, &[sampled_var], "AlbedoMap", &[]);
    b.op(OP_DECORATE, &[sampled_var, DEC_DESCRIPTOR_SET, 0]);
    b.op(OP_DECORATE, &[sampled_var, DEC_BINDING, 1]);
    b.op(OP_TYPE_FLOAT, &[f32_ty, 32]);
    b.op(
        OP_TYPE_IMAGE,
        &[image_ty, f32_ty, DIM_2D, 0, 0, 0, 1, IMAGE_FORMAT_UNKNOWN],
    );
    b.op(OP_TYPE_SAMPLED_IMAGE, &[sampled_ty, image_ty]);
    b.op(OP_TYPE_POINTER, &[sampled_ptr, SC_UNIFORM_CONSTANT, sampled_ty]);
    b.op(OP_VARIABLE, &[sampled_ptr, sampled_var, SC_UNIFORM_CONSTANT]);
    b.op(OP_TYPE_VOID, &[void_ty]);
    b.op(OP_TYPE_FUNCTION, &[fn_ty, void_ty]);
    emit_main(&mut b, void_ty, fn_ty, main_fn, label);
    b.build()
}

/// Compute stage with no declared resources
pub fn compute_empty() -> Vec<u32> {
    let mut b = ModuleBuilder::new();
    let main_fn = b.id();
    let void_ty = b.id();
    let fn_ty = b.id();
    let label = b.id();

    b.op(OP_CAPABILITY, &[CAP_SHADER]);
    b.op(OP_MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450]);
    b.op_str(OP_ENTRY_POINT, &[EXEC_MODEL_GLCOMPUTE, main_fn], "main", &[]);
    b.op(
        OP_EXECUTION_MODE,
        &[main_fn, EXEC_MODE_LOCAL_SIZE, 1, 1, 1],
    );
    b.op(OP_TYPE_VOID, &[void_ty]);
    b.op(OP_TYPE_FUNCTION, &[fn_ty, void_ty]);
    emit_main(&mut b, void_ty, fn_ty, main_fn, label);
    b.build()
}

/// Vertex stage with a single unrecognized input `inWibble` (vec3, location 3)
pub fn vertex_unknown_input() -> Vec<u32> {
    let mut b = ModuleBuilder::new();
    let main_fn = b.id();
    let f32_ty = b.id();
    let vec3_ty = b.id();
    let input_ptr = b.id();
    let input_var = b.id();
    let void_ty = b.id();
    let fn_ty = b.id();
    let label = b.id();

    b.op(OP_CAPABILITY, &[CAP_SHADER]);
    b.op(OP_MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450]);
    b.op_str(
        OP_ENTRY_POINT,
        &[EXEC_MODEL_VERTEX, main_fn],
        "main",
        &[input_var],
    );
    b.op_str(OP_NAME, &[input_var], "inWibble", &[]);
    b.op(OP_DECORATE, &[input_var, DEC_LOCATION, 3]);
    b.op(OP_TYPE_FLOAT, &[f32_ty, 32]);
    b.op(OP_TYPE_VECTOR, &[vec3_ty, f32_ty, 3]);
    b.op(OP_TYPE_POINTER, &[input_ptr, SC_INPUT, vec3_ty]);
    b.op(OP_VARIABLE, &[input_ptr, input_var, SC_INPUT]);
    b.op(OP_TYPE_VOID, &[void_ty]);
    b.op(OP_TYPE_FUNCTION, &[fn_ty, void_ty]);
    emit_main(&mut b, void_ty, fn_ty, main_fn, label);
    b.build()
}

/// Serialize words to the on-disk .spv byte layout
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}
