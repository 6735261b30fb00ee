//! AST-to-Cranelift compiler
//!
//! Generates one native function per pattern:
//!
//! ```text
//! fn(*mut NativeContext) -> i64
//! ```
//!
//! Matching primitives and all state updates are calls into the runtime
//! helpers. Sequencing, alternation and loops are native control flow. Every
//! choice point is a block with a numeric resume id; the shared `fail` block
//! asks the runtime to unwind and dispatches on the returned id through a
//! [`Switch`].

use cranelift::prelude::*;
use cranelift_frontend::Switch;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};
use tracing::trace;

use super::context::NativeTables;
use super::matcher::NativeFn;
use super::error::{JitError, JitResult};
use super::runtime::{
    self, ASSERT_END, ASSERT_NOT_WORD_BOUNDARY, ASSERT_START, ASSERT_WORD_BOUNDARY,
};
use super::{BackrefPolicy, NATIVE_FALLBACK, NATIVE_MATCH, NATIVE_NO_MATCH};
use crate::syntax::{canonicalize, Assertion, CharClass, Node, ParsedPattern};

/// Imported runtime helpers
#[derive(Clone, Copy)]
struct HelperIds {
    char: FuncId,
    char_fold: FuncId,
    any: FuncId,
    class: FuncId,
    assert: FuncId,
    save: FuncId,
    reset: FuncId,
    mark: FuncId,
    check_progress: FuncId,
    push_resume: FuncId,
    backtrack: FuncId,
}

/// Helper references inside the function being built
#[derive(Clone, Copy)]
struct HelperRefs {
    char: codegen::ir::FuncRef,
    char_fold: codegen::ir::FuncRef,
    any: codegen::ir::FuncRef,
    class: codegen::ir::FuncRef,
    assert: codegen::ir::FuncRef,
    save: codegen::ir::FuncRef,
    reset: codegen::ir::FuncRef,
    mark: codegen::ir::FuncRef,
    check_progress: codegen::ir::FuncRef,
    push_resume: codegen::ir::FuncRef,
    backtrack: codegen::ir::FuncRef,
}

/// Output of a successful native compilation
pub struct CompiledFunction {
    pub module: JITModule,
    pub func: NativeFn,
    pub tables: NativeTables,
}

/// Native compiler for one pattern
///
/// Owns a fresh [`JITModule`]; the module moves into the result so its code
/// lives exactly as long as the matcher using it.
pub struct NativeCompiler {
    module: JITModule,
    helpers: HelperIds,
}

impl NativeCompiler {
    /// Set up the host ISA and register the runtime helpers
    pub fn new() -> JitResult<Self> {
        let mut flag_builder = settings::builder();
        flag_builder.set("opt_level", "speed").map_err(|e| {
            JitError::CompilationError(format!("Failed to set opt_level: {}", e))
        })?;

        let isa_builder = cranelift_native::builder().map_err(|e| {
            JitError::CompilationError(format!("Failed to create ISA builder: {}", e))
        })?;

        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| JitError::CompilationError(format!("Failed to create ISA: {}", e)))?;

        let mut builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        for (name, ptr, _) in runtime::runtime_symbols() {
            builder.symbol(name, ptr);
        }

        let mut module = JITModule::new(builder);
        let helpers = Self::declare_helpers(&mut module)?;
        Ok(Self { module, helpers })
    }

    /// Declare every helper as an import: `fn(ctx, args..) -> i64`
    fn declare_helpers(module: &mut JITModule) -> JitResult<HelperIds> {
        let mut declare = |wanted: &str| -> JitResult<FuncId> {
            let (name, _, params) = runtime::runtime_symbols()
                .into_iter()
                .find(|(name, _, _)| *name == wanted)
                .ok_or_else(|| {
                    JitError::CompilationError(format!("Unknown runtime helper: {}", wanted))
                })?;
            let mut sig = module.make_signature();
            for _ in 0..params {
                sig.params.push(AbiParam::new(types::I64));
            }
            sig.returns.push(AbiParam::new(types::I64));
            module
                .declare_function(name, Linkage::Import, &sig)
                .map_err(|e| {
                    JitError::CompilationError(format!("Failed to declare {}: {}", name, e))
                })
        };

        Ok(HelperIds {
            char: declare("rexvm_rt_char")?,
            char_fold: declare("rexvm_rt_char_fold")?,
            any: declare("rexvm_rt_any")?,
            class: declare("rexvm_rt_class")?,
            assert: declare("rexvm_rt_assert")?,
            save: declare("rexvm_rt_save")?,
            reset: declare("rexvm_rt_reset")?,
            mark: declare("rexvm_rt_mark")?,
            check_progress: declare("rexvm_rt_check_progress")?,
            push_resume: declare("rexvm_rt_push_resume")?,
            backtrack: declare("rexvm_rt_backtrack")?,
        })
    }

    /// Compile `pattern` to native code
    ///
    /// Callers check [`super::check_supported`] first; constructs the native
    /// tier cannot express are rejected here as well.
    pub fn compile(
        mut self,
        name: &str,
        pattern: &ParsedPattern,
        policy: BackrefPolicy,
    ) -> JitResult<CompiledFunction> {
        super::check_supported(pattern, policy)?;

        let mut sig = self.module.make_signature();
        sig.params.push(AbiParam::new(types::I64)); // ctx pointer
        sig.returns.push(AbiParam::new(types::I64)); // status code

        let func_id = self
            .module
            .declare_function(name, Linkage::Local, &sig)
            .map_err(|e| JitError::CompilationError(format!("Failed to declare function: {}", e)))?;

        let mut ctx = self.module.make_context();
        ctx.func.signature = sig;

        let mut tables = NativeTables {
            classes: Vec::new(),
            slot_count: pattern.slot_count(),
            register_count: 0,
            ignore_case: pattern.ignore_case(),
            multiline: pattern.multiline(),
        };

        {
            let mut func_ctx = FunctionBuilderContext::new();
            let mut builder = FunctionBuilder::new(&mut ctx.func, &mut func_ctx);
            let refs = self.import_helpers(&mut builder);
            let mut codegen = Codegen::new(&mut builder, refs, &mut tables, pattern.ignore_case());
            codegen.emit_pattern(&pattern.root)?;
            builder.seal_all_blocks();
            builder.finalize();
        }

        trace!(target: "rexvm::jit::compiler::ir", ir = %ctx.func.display(), "Generated IR");

        self.module
            .define_function(func_id, &mut ctx)
            .map_err(|e| JitError::CompilationError(format!("Failed to define function: {}", e)))?;

        self.module.clear_context(&mut ctx);

        self.module.finalize_definitions().map_err(|e| {
            JitError::CompilationError(format!("Failed to finalize definitions: {}", e))
        })?;

        let code_ptr = self.module.get_finalized_function(func_id);
        // SAFETY: the function was declared with the `NativeFn` signature above
        let func = unsafe { std::mem::transmute::<*const u8, NativeFn>(code_ptr) };

        Ok(CompiledFunction {
            module: self.module,
            func,
            tables,
        })
    }

    fn import_helpers(&mut self, builder: &mut FunctionBuilder) -> HelperRefs {
        let ids = self.helpers;
        let mut import = |id| self.module.declare_func_in_func(id, builder.func);
        HelperRefs {
            char: import(ids.char),
            char_fold: import(ids.char_fold),
            any: import(ids.any),
            class: import(ids.class),
            assert: import(ids.assert),
            save: import(ids.save),
            reset: import(ids.reset),
            mark: import(ids.mark),
            check_progress: import(ids.check_progress),
            push_resume: import(ids.push_resume),
            backtrack: import(ids.backtrack),
        }
    }
}

/// IR generation state for one function
struct Codegen<'a, 'b> {
    builder: &'a mut FunctionBuilder<'b>,
    helpers: HelperRefs,
    tables: &'a mut NativeTables,
    ignore_case: bool,
    ctx_ptr: Value,
    /// Shared failure path: unwind and dispatch
    fail: Block,
    /// Return `NATIVE_FALLBACK`
    fallback: Block,
    /// Resume blocks indexed by id
    resumes: Vec<Block>,
}

impl<'a, 'b> Codegen<'a, 'b> {
    fn new(
        builder: &'a mut FunctionBuilder<'b>,
        helpers: HelperRefs,
        tables: &'a mut NativeTables,
        ignore_case: bool,
    ) -> Self {
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        let ctx_ptr = builder.block_params(entry)[0];
        let fail = builder.create_block();
        let fallback = builder.create_block();
        Self {
            builder,
            helpers,
            tables,
            ignore_case,
            ctx_ptr,
            fail,
            fallback,
            resumes: Vec::new(),
        }
    }

    /// `save 0; <root>; save 1; return MATCH` plus the shared exit blocks
    fn emit_pattern(&mut self, root: &Node) -> JitResult<()> {
        self.save(0);
        self.emit_node(root)?;
        self.save(1);
        let matched = self.builder.ins().iconst(types::I64, NATIVE_MATCH);
        self.builder.ins().return_(&[matched]);

        self.emit_fail_block();

        self.builder.switch_to_block(self.fallback);
        let code = self.builder.ins().iconst(types::I64, NATIVE_FALLBACK);
        self.builder.ins().return_(&[code]);
        Ok(())
    }

    fn emit_fail_block(&mut self) {
        let no_match = self.builder.create_block();

        self.builder.switch_to_block(self.fail);
        let id = self.call(self.helpers.backtrack, &[]);
        let mut switch = Switch::new();
        for (index, block) in self.resumes.iter().enumerate() {
            switch.set_entry(index as u128, *block);
        }
        switch.emit(self.builder, id, no_match);

        self.builder.switch_to_block(no_match);
        let code = self.builder.ins().iconst(types::I64, NATIVE_NO_MATCH);
        self.builder.ins().return_(&[code]);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn call(&mut self, func: codegen::ir::FuncRef, args: &[i64]) -> Value {
        let mut values = Vec::with_capacity(args.len() + 1);
        values.push(self.ctx_ptr);
        for &arg in args {
            values.push(self.builder.ins().iconst(types::I64, arg));
        }
        let call = self.builder.ins().call(func, &values);
        self.builder.inst_results(call)[0]
    }

    /// Continue when `ok` is non-zero, otherwise branch to `otherwise`
    fn branch_on(&mut self, ok: Value, otherwise: Block) {
        let cont = self.builder.create_block();
        self.builder.ins().brif(ok, cont, &[], otherwise, &[]);
        self.builder.switch_to_block(cont);
    }

    /// Call a matching helper; failure backtracks
    fn test(&mut self, func: codegen::ir::FuncRef, args: &[i64]) {
        let ok = self.call(func, args);
        self.branch_on(ok, self.fail);
    }

    /// Call a stack helper; overflow abandons the native attempt
    fn push(&mut self, func: codegen::ir::FuncRef, args: &[i64]) {
        let ok = self.call(func, args);
        self.branch_on(ok, self.fallback);
    }

    fn save(&mut self, slot: u32) {
        self.push(self.helpers.save, &[slot as i64]);
    }

    fn new_resume(&mut self) -> (i64, Block) {
        let block = self.builder.create_block();
        self.resumes.push(block);
        ((self.resumes.len() - 1) as i64, block)
    }

    fn push_resume(&mut self, id: i64) {
        self.push(self.helpers.push_resume, &[id]);
    }

    fn jump_to(&mut self, block: Block) {
        self.builder.ins().jump(block, &[]);
        self.builder.switch_to_block(block);
    }

    fn class_index(&mut self, class: &CharClass) -> i64 {
        let index = match self.tables.classes.iter().position(|c| c == class) {
            Some(index) => index,
            None => {
                self.tables.classes.push(class.clone());
                self.tables.classes.len() - 1
            }
        };
        index as i64
    }

    fn alloc_register(&mut self) -> i64 {
        self.tables.register_count += 1;
        (self.tables.register_count - 1) as i64
    }

    fn emit_reset(&mut self, node: &Node) {
        if let Some((lo, hi)) = node.capture_range() {
            self.push(self.helpers.reset, &[(lo * 2) as i64, (hi * 2) as i64]);
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    fn emit_node(&mut self, node: &Node) -> JitResult<()> {
        match node {
            Node::Empty => {}
            Node::Literal(c) => {
                if self.ignore_case {
                    self.test(self.helpers.char_fold, &[canonicalize(*c) as i64]);
                } else {
                    self.test(self.helpers.char, &[*c as i64]);
                }
            }
            Node::Any => self.test(self.helpers.any, &[]),
            Node::Class(class) => {
                let index = self.class_index(class);
                self.test(self.helpers.class, &[index]);
            }
            Node::Assert(assertion) => {
                let kind = match assertion {
                    Assertion::Start => ASSERT_START,
                    Assertion::End => ASSERT_END,
                    Assertion::WordBoundary => ASSERT_WORD_BOUNDARY,
                    Assertion::NotWordBoundary => ASSERT_NOT_WORD_BOUNDARY,
                };
                self.test(self.helpers.assert, &[kind as i64]);
            }
            Node::Capture { index, node } => {
                self.save(index * 2);
                self.emit_node(node)?;
                self.save(index * 2 + 1);
            }
            Node::Concat(nodes) => {
                for node in nodes {
                    self.emit_node(node)?;
                }
            }
            Node::Alternate(alternatives) => self.emit_alternation(alternatives)?,
            Node::Repeat {
                node,
                min,
                max,
                greedy,
            } => self.emit_repeat(node, *min, *max, *greedy)?,
            Node::Backref(_) => {
                // Deferred: hand the whole attempt to the bytecode tier
                let zero = self.builder.ins().iconst(types::I64, 0);
                self.branch_on(zero, self.fallback);
            }
            Node::Look { .. } => {
                return Err(JitError::NotCompilable(
                    "lookahead is not supported natively".to_string(),
                ))
            }
        }
        Ok(())
    }

    fn emit_alternation(&mut self, alternatives: &[Node]) -> JitResult<()> {
        let Some((last, rest)) = alternatives.split_last() else {
            return Ok(());
        };
        let join = self.builder.create_block();
        for alternative in rest {
            let (next_id, next) = self.new_resume();
            self.push_resume(next_id);
            self.emit_node(alternative)?;
            self.builder.ins().jump(join, &[]);
            self.builder.switch_to_block(next);
        }
        self.emit_node(last)?;
        self.jump_to(join);
        Ok(())
    }

    /// `mark r; reset; body; check_progress r`
    fn emit_optional_body(&mut self, node: &Node, register: i64) -> JitResult<()> {
        self.push(self.helpers.mark, &[register]);
        self.emit_reset(node);
        self.emit_node(node)?;
        self.test(self.helpers.check_progress, &[register]);
        Ok(())
    }

    fn emit_repeat(
        &mut self,
        node: &Node,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> JitResult<()> {
        for _ in 0..min {
            self.emit_reset(node);
            self.emit_node(node)?;
        }

        match max {
            Some(max) if max <= min => {}
            Some(max) => {
                let register = self.alloc_register();
                if greedy {
                    let (end_id, end) = self.new_resume();
                    for _ in min..max {
                        self.push_resume(end_id);
                        self.emit_optional_body(node, register)?;
                    }
                    self.jump_to(end);
                } else {
                    let end = self.builder.create_block();
                    for _ in min..max {
                        let (body_id, body) = self.new_resume();
                        self.push_resume(body_id);
                        self.builder.ins().jump(end, &[]);
                        self.builder.switch_to_block(body);
                        self.emit_optional_body(node, register)?;
                    }
                    self.jump_to(end);
                }
            }
            None => {
                let register = self.alloc_register();
                let head = self.builder.create_block();
                self.jump_to(head);
                if greedy {
                    let (exit_id, exit) = self.new_resume();
                    self.push_resume(exit_id);
                    self.emit_optional_body(node, register)?;
                    self.builder.ins().jump(head, &[]);
                    self.builder.switch_to_block(exit);
                } else {
                    let (body_id, body) = self.new_resume();
                    let exit = self.builder.create_block();
                    self.push_resume(body_id);
                    self.builder.ins().jump(exit, &[]);
                    self.builder.switch_to_block(body);
                    self.emit_optional_body(node, register)?;
                    self.builder.ins().jump(head, &[]);
                    self.builder.switch_to_block(exit);
                }
            }
        }
        Ok(())
    }
}
