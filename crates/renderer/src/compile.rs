//! CPU half of program compilation.
//!
//! Gallery shaders are written for WebGL (`attribute`/`varying`, `gl_FragColor`,
//! free-standing `uniform` declarations) or in ShaderToy style (`mainImage`).
//! Each stage is rewritten into Vulkan-flavoured GLSL 450 and then parsed and
//! validated with naga, so compile and link errors surface here with source
//! context instead of inside the GPU driver:
//!
//! 1. `#version` and `precision` statements are blanked.
//! 2. `uniform` declarations of plain data types are blanked and become members
//!    of the std140 block declared in the prelude. `iResolution`, `iTime` and
//!    `iMouse` are driven every frame; the shader's own uniforms stay zero.
//!    Both stages declare the same block.
//! 3. Interface declarations gain explicit `layout(location = N)` qualifiers.
//!    Varyings are matched between stages by name, as a GL linker would.
//! 4. The fragment footer remaps `gl_FragCoord` to a bottom-left origin and
//!    drives either the user's `main` or `mainImage`.
//!
//! Blanked lines are kept as empty lines, so a user line sits at a fixed
//! distance from the prelude. Diagnostics are reported as `line:column` in the
//! user's source.
use std::error::Error as _;
use std::fmt;

use wgpu::naga::front::glsl::{Frontend, Options, ParseErrors};
use wgpu::naga::valid::{Capabilities, ValidationError, ValidationFlags, Validator};
use wgpu::naga::{AddressSpace, Module, ShaderStage, SourceLocation, TypeInner, WithSpan};

/// Vertex shader used when a gallery does not ship its own.
pub const DEFAULT_VERTEX_SHADER: &str = "attribute vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Attribute the full-screen quad is bound to.
pub const POSITION_ATTRIBUTE: &str = "a_position";

const BUILTIN_UNIFORMS: [&str; 3] = ["iResolution", "iTime", "iMouse"];
const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];
const FRAGMENT_OUTPUT: &str = "gallery_FragColor";

/// Uniform types that can live in the std140 block. Booleans are stored as
/// integers and converted back on use.
const BLOCK_TYPES: &[&str] = &[
    "float", "int", "uint", "bool", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "uvec2",
    "uvec3", "uvec4", "bvec2", "bvec3", "bvec4", "mat2", "mat3", "mat4", "mat2x2", "mat2x3",
    "mat2x4", "mat3x2", "mat3x3", "mat3x4", "mat4x2", "mat4x3", "mat4x4",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("vertex shader failed to compile:\n{0}")]
    Vertex(String),
    #[error("fragment shader failed to compile:\n{0}")]
    Fragment(String),
    #[error("program failed to link: {0}")]
    Link(String),
}

/// Byte offsets of the gallery uniforms inside the program's uniform block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformHandles {
    pub resolution: Option<u32>,
    pub time: Option<u32>,
    pub mouse: Option<u32>,
    /// Size of the whole block in bytes.
    pub block_size: u32,
}

impl UniformHandles {
    pub fn is_complete(&self) -> bool {
        self.resolution.is_some() && self.time.is_some() && self.mouse.is_some()
    }
}

impl fmt::Display for UniformHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn slot(offset: Option<u32>) -> String {
            offset.map_or_else(|| "none".to_string(), |offset| format!("+{offset}"))
        }
        write!(
            f,
            "iResolution {} iTime {} iMouse {} ({} bytes)",
            slot(self.resolution),
            slot(self.time),
            slot(self.mouse),
            self.block_size
        )
    }
}

/// Both stages rewritten, validated and reflected; ready for the GPU.
#[derive(Debug, Clone)]
pub struct CompiledStages {
    pub vertex: String,
    pub fragment: String,
    pub handles: UniformHandles,
    /// Shader location of `a_position`.
    pub position_location: u32,
}

/// Rewrites, parses and validates a vertex/fragment pair.
pub fn compile_stages(vertex: &str, fragment: &str) -> Result<CompiledStages, CompileError> {
    let uniforms = gather_uniforms(vertex, fragment)?;
    let vertex_stage = wrap_stage(vertex, ShaderStage::Vertex, &[], &uniforms)?;
    let fragment_stage = wrap_stage(
        fragment,
        ShaderStage::Fragment,
        &vertex_stage.outputs,
        &uniforms,
    )?;

    validate(&vertex_stage).map_err(CompileError::Vertex)?;
    let fragment_module = validate(&fragment_stage).map_err(CompileError::Fragment)?;

    let position_location = vertex_stage
        .inputs
        .iter()
        .find(|slot| slot.name == POSITION_ATTRIBUTE)
        .map(|slot| slot.location)
        .ok_or_else(|| {
            CompileError::Link(format!(
                "vertex shader does not declare the `{POSITION_ATTRIBUTE}` attribute"
            ))
        })?;

    if let Some(unmatched) = fragment_stage
        .inputs
        .iter()
        .find(|input| !vertex_stage.outputs.iter().any(|out| out.name == input.name))
    {
        return Err(CompileError::Link(format!(
            "varying `{}` is read by the fragment shader but never written by the vertex shader",
            unmatched.name
        )));
    }

    let handles = reflect_uniforms(&fragment_module);
    Ok(CompiledStages {
        vertex: vertex_stage.source,
        fragment: fragment_stage.source,
        handles,
        position_location,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InterfaceSlot {
    name: String,
    location: u32,
}

#[derive(Debug)]
struct WrappedStage {
    stage: ShaderStage,
    source: String,
    inputs: Vec<InterfaceSlot>,
    outputs: Vec<InterfaceSlot>,
    /// Lines in front of the user's first line.
    prelude_lines: u32,
    user_lines: u32,
}

impl WrappedStage {
    /// `line:column` in the user's source, or a marker for the generated
    /// prelude and footer.
    fn position(&self, location: &SourceLocation) -> String {
        match location.line_number.checked_sub(self.prelude_lines) {
            Some(line) if line >= 1 && line <= self.user_lines => {
                format!("{line}:{}", location.line_position)
            }
            _ => "<generated>".to_string(),
        }
    }

    fn describe_parse_errors(&self, errors: &ParseErrors) -> String {
        errors
            .errors
            .iter()
            .map(|error| {
                let location = error.meta.location(&self.source);
                format!("{}: {}", self.position(&location), error.kind)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn describe_validation_error(&self, error: &WithSpan<ValidationError>) -> String {
        let mut message = error.to_string();
        let mut cause = error.source();
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        match error.location(&self.source) {
            Some(location) => format!("{}: {message}", self.position(&location)),
            None => message,
        }
    }
}

fn validate(wrapped: &WrappedStage) -> Result<Module, String> {
    let module = Frontend::default()
        .parse(&Options::from(wrapped.stage), &wrapped.source)
        .map_err(|errors| wrapped.describe_parse_errors(&errors))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| wrapped.describe_validation_error(&error))?;
    Ok(module)
}

fn reflect_uniforms(module: &Module) -> UniformHandles {
    for (_, variable) in module.global_variables.iter() {
        if variable.space != AddressSpace::Uniform {
            continue;
        }
        let at_gallery_slot = variable
            .binding
            .as_ref()
            .is_some_and(|binding| binding.group == 0 && binding.binding == 0);
        if !at_gallery_slot {
            continue;
        }
        if let TypeInner::Struct { members, span } = &module.types[variable.ty].inner {
            let offset_of = |name: &str| {
                members
                    .iter()
                    .find(|member| member.name.as_deref() == Some(name))
                    .map(|member| member.offset)
            };
            return UniformHandles {
                resolution: offset_of("_iResolution"),
                time: offset_of("_iTime"),
                mouse: offset_of("_iMouse"),
                block_size: *span,
            };
        }
    }
    UniformHandles::default()
}

fn wrap_stage(
    source: &str,
    stage: ShaderStage,
    upstream: &[InterfaceSlot],
    uniforms: &[UserUniform],
) -> Result<WrappedStage, CompileError> {
    let mut rewriter = Rewriter::new(stage, upstream);
    let mut scope = ScopeTracker::default();
    let mut body = String::with_capacity(source.len() + 256);

    for line in source.lines() {
        let rewritten = if scope.at_global_scope() {
            rewriter.rewrite(line)
        } else {
            None
        };
        scope.feed(line);
        body.push_str(rewritten.as_deref().unwrap_or(line));
        body.push('\n');
    }

    let Rewriter {
        inputs, outputs, ..
    } = rewriter;

    let (prelude, footer) = match stage {
        ShaderStage::Fragment => {
            let entry = FragmentEntry::detect(source).ok_or_else(|| {
                CompileError::Fragment("no `main` or `mainImage` function found".to_string())
            })?;
            let output = outputs
                .first()
                .map(|slot| slot.name.as_str())
                .unwrap_or(FRAGMENT_OUTPUT);
            (
                fragment_prelude(uniforms, outputs.is_empty(), entry),
                fragment_footer(entry, output),
            )
        }
        _ => (uniform_prelude(uniforms), String::new()),
    };

    Ok(WrappedStage {
        stage,
        prelude_lines: prelude.matches('\n').count() as u32,
        user_lines: source.lines().count() as u32,
        source: format!("{prelude}{body}{footer}"),
        inputs,
        outputs,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentEntry {
    Main,
    MainImage,
}

impl FragmentEntry {
    fn detect(source: &str) -> Option<Self> {
        if declares_function(source, "main") {
            Some(Self::Main)
        } else if declares_function(source, "mainImage") {
            Some(Self::MainImage)
        } else {
            None
        }
    }
}

/// Uniform block shared by both stages. Member offsets are read back from the
/// validated module, never assumed.
fn uniform_prelude(uniforms: &[UserUniform]) -> String {
    let mut prelude = String::from(
        r"#version 450
layout(std140, set = 0, binding = 0) uniform GalleryParams {
    vec2 _iResolution;
    float _iTime;
    float _padding0;
    vec4 _iMouse;
",
    );
    for uniform in uniforms {
        prelude.push_str(&uniform.member());
    }
    prelude.push_str(
        r"} gallery;

#define iResolution gallery._iResolution
#define iTime gallery._iTime
#define iMouse gallery._iMouse
",
    );
    for uniform in uniforms {
        prelude.push_str(&uniform.alias());
    }
    prelude
}

fn fragment_prelude(
    uniforms: &[UserUniform],
    declare_output: bool,
    entry: FragmentEntry,
) -> String {
    let mut prelude = uniform_prelude(uniforms);
    if declare_output {
        prelude.push_str("layout(location = 0) out vec4 gallery_FragColor;\n");
        prelude.push_str("#define gl_FragColor gallery_FragColor\n");
    }
    prelude.push_str("vec4 gallery_FragCoord;\n#define gl_FragCoord gallery_FragCoord\n");
    if entry == FragmentEntry::Main {
        prelude.push_str("#define main gallery_user_main\n");
    }
    prelude
}

fn fragment_footer(entry: FragmentEntry, output: &str) -> String {
    let call = match entry {
        FragmentEntry::Main => "    gallery_user_main();\n".to_string(),
        FragmentEntry::MainImage => format!(
            "    vec4 gallery_color = vec4(0.0, 0.0, 0.0, 1.0);\n    mainImage(gallery_color, gallery_FragCoord.xy);\n    {output} = gallery_color;\n"
        ),
    };
    format!(
        r"#undef main
void main() {{
#undef gl_FragCoord
    gallery_FragCoord = vec4(gl_FragCoord.x, iResolution.y - gl_FragCoord.y, gl_FragCoord.z, gl_FragCoord.w);
#define gl_FragCoord gallery_FragCoord
{call}}}
"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
}

struct Rewriter<'a> {
    stage: ShaderStage,
    upstream: &'a [InterfaceSlot],
    inputs: Vec<InterfaceSlot>,
    outputs: Vec<InterfaceSlot>,
    unmatched_inputs: u32,
}

impl<'a> Rewriter<'a> {
    fn new(stage: ShaderStage, upstream: &'a [InterfaceSlot]) -> Self {
        Self {
            stage,
            upstream,
            inputs: Vec::new(),
            outputs: Vec::new(),
            unmatched_inputs: 0,
        }
    }

    /// Replacement for a global-scope line, or `None` to keep it verbatim.
    fn rewrite(&mut self, line: &str) -> Option<String> {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || keyword(trimmed, "precision").is_some() {
            return Some(String::new());
        }
        if let Some(rest) = keyword(trimmed, "uniform") {
            return rewrite_uniform(rest);
        }

        let vertex = self.stage == ShaderStage::Vertex;
        let (direction, rest) = if let Some(rest) = keyword(trimmed, "attribute") {
            (Direction::In, rest)
        } else if let Some(rest) = keyword(trimmed, "varying") {
            let direction = if vertex { Direction::Out } else { Direction::In };
            (direction, rest)
        } else if let Some(rest) = keyword(trimmed, "in") {
            (Direction::In, rest)
        } else if let Some(rest) = keyword(trimmed, "out") {
            (Direction::Out, rest)
        } else {
            return None;
        };

        let declaration = Declaration::parse(rest)?;
        let qualifier = match direction {
            Direction::In => "in",
            Direction::Out => "out",
        };
        let mut rewritten = Vec::with_capacity(declaration.names.len());
        for name in &declaration.names {
            let location = self.assign(direction, name);
            rewritten.push(format!(
                "layout(location = {location}) {qualifier} {ty} {name};",
                ty = declaration.ty
            ));
        }
        let mut line = rewritten.join(" ");
        line.push_str(declaration.trailing);
        Some(line)
    }

    fn assign(&mut self, direction: Direction, name: &str) -> u32 {
        let base = base_name(name).to_string();
        match direction {
            Direction::Out => {
                let location = self.outputs.len() as u32;
                self.outputs.push(InterfaceSlot {
                    name: base,
                    location,
                });
                location
            }
            Direction::In => {
                let location = if self.stage == ShaderStage::Fragment {
                    match self.upstream.iter().find(|slot| slot.name == base) {
                        Some(slot) => slot.location,
                        None => {
                            let location = self.upstream.len() as u32 + self.unmatched_inputs;
                            self.unmatched_inputs += 1;
                            location
                        }
                    }
                } else {
                    self.inputs.len() as u32
                };
                self.inputs.push(InterfaceSlot {
                    name: base,
                    location,
                });
                location
            }
        }
    }
}

/// Blanks declarations whose names live in the gallery block. Samplers and
/// user blocks are kept verbatim.
fn rewrite_uniform(rest: &str) -> Option<String> {
    let declaration = Declaration::parse(rest).filter(Declaration::is_hoistable)?;
    Some(declaration.trailing.trim_start().to_string())
}

/// A uniform the shader declares for itself. It becomes a member of the
/// gallery block under a `_`-prefixed name, aliased back with `#define`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UserUniform {
    ty: String,
    name: String,
    /// Array suffix such as `[4]`, or empty.
    array: String,
}

impl UserUniform {
    fn new(ty: &str, declared: &str) -> Self {
        let array = declared.find('[').map_or("", |start| &declared[start..]);
        Self {
            ty: ty.to_string(),
            name: base_name(declared).to_string(),
            array: array.split_whitespace().collect(),
        }
    }

    fn is_boolean(&self) -> bool {
        is_boolean(&self.ty)
    }

    fn member(&self) -> String {
        let ty = match self.ty.as_str() {
            "bool" => "int".to_string(),
            ty => match ty.strip_prefix("bvec") {
                Some(width) => format!("ivec{width}"),
                None => ty.to_string(),
            },
        };
        format!("    {ty} _{}{};\n", self.name, self.array)
    }

    fn alias(&self) -> String {
        let name = &self.name;
        if self.is_boolean() {
            format!("#define {name} {}(gallery._{name})\n", self.ty)
        } else {
            format!("#define {name} gallery._{name}\n")
        }
    }
}

fn is_boolean(ty: &str) -> bool {
    ty == "bool" || ty.starts_with("bvec")
}

/// Global `uniform` declarations of both stages, builtins excluded. A name
/// declared twice must agree on its type.
fn gather_uniforms(vertex: &str, fragment: &str) -> Result<Vec<UserUniform>, CompileError> {
    let mut uniforms: Vec<UserUniform> = Vec::new();
    for uniform in declared_uniforms(vertex)
        .into_iter()
        .chain(declared_uniforms(fragment))
    {
        match uniforms.iter().find(|known| known.name == uniform.name) {
            Some(known) if *known != uniform => {
                return Err(CompileError::Link(format!(
                    "uniform `{}` is declared as both `{}{}` and `{}{}`",
                    uniform.name, known.ty, known.array, uniform.ty, uniform.array
                )));
            }
            Some(_) => {}
            None => uniforms.push(uniform),
        }
    }
    Ok(uniforms)
}

fn declared_uniforms(source: &str) -> Vec<UserUniform> {
    let mut scope = ScopeTracker::default();
    let mut found = Vec::new();
    for line in source.lines() {
        if scope.at_global_scope() {
            let declaration = keyword(line.trim_start(), "uniform")
                .and_then(Declaration::parse)
                .filter(Declaration::is_hoistable);
            if let Some(declaration) = declaration {
                found.extend(
                    declaration
                        .names
                        .iter()
                        .filter(|name| !BUILTIN_UNIFORMS.contains(&base_name(name)))
                        .map(|name| UserUniform::new(&declaration.ty, name)),
                );
            }
        }
        scope.feed(line);
    }
    found
}

/// `<type> <name>[, <name>...];` with precision qualifiers removed from the type.
struct Declaration<'a> {
    ty: String,
    names: Vec<&'a str>,
    trailing: &'a str,
}

impl<'a> Declaration<'a> {
    fn parse(rest: &'a str) -> Option<Self> {
        let (declaration, trailing) = rest.split_once(';')?;
        if declaration.contains('{') || declaration.contains('(') {
            return None;
        }
        let mut parts = declaration.split(',');
        let first = parts.next()?.trim();
        let (ty, first_name) = first.rsplit_once(char::is_whitespace)?;
        let ty = ty
            .split_whitespace()
            .filter(|token| !PRECISION_QUALIFIERS.contains(token))
            .collect::<Vec<_>>()
            .join(" ");
        if ty.is_empty() {
            return None;
        }
        let mut names = vec![first_name.trim()];
        names.extend(parts.map(str::trim).filter(|name| !name.is_empty()));
        Some(Self {
            ty,
            names,
            trailing,
        })
    }

    /// Plain data without initialisers. Boolean arrays are left out because
    /// their integer storage cannot be converted back element-wise.
    fn is_hoistable(&self) -> bool {
        BLOCK_TYPES.contains(&self.ty.as_str())
            && self.names.iter().all(|name| {
                !name.contains('=') && !(is_boolean(&self.ty) && name.contains('['))
            })
    }
}

fn keyword<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    rest.starts_with(char::is_whitespace).then_some(rest)
}

/// Declared name without an array suffix.
fn base_name(name: &str) -> &str {
    name.split('[').next().unwrap_or(name).trim()
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn declares_function(source: &str, name: &str) -> bool {
    source.match_indices(name).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = &source[start + name.len()..];
        before.map_or(true, |ch| !is_identifier_char(ch))
            && !after.starts_with(is_identifier_char)
            && after.trim_start().starts_with('(')
    })
}

/// Tracks brace and parenthesis depth so interface rewriting only touches
/// global declarations, never function parameters or locals.
#[derive(Default)]
struct ScopeTracker {
    braces: u32,
    parens: u32,
    in_block_comment: bool,
}

impl ScopeTracker {
    fn at_global_scope(&self) -> bool {
        self.braces == 0 && self.parens == 0 && !self.in_block_comment
    }

    fn feed(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            if self.in_block_comment {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            match ch {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '{' => self.braces += 1,
                '}' => self.braces = self.braces.saturating_sub(1),
                '(' => self.parens += 1,
                ')' => self.parens = self.parens.saturating_sub(1),
                _ => {}
            }
        }
    }
}
