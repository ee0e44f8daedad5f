use anyhow::{Context, Result, anyhow};
use std::fmt::Write as _;
use std::fs;

use crate::dependency_graph::ModuleNode;
use crate::util::normalize_line_endings;

/// Name the entry script is registered under inside the bundle.
pub const ROOT_MODULE_NAME: &str = "__root";

/// Emits the single-file bundle: a require shim prelude, one registered
/// function scope per module, and a trailing call that runs the entry.
///
/// The output format is compatible with luabundle's runtime contract:
/// modules load lazily through `__bundle_require`, a loading placeholder
/// guards against require cycles, and when the bundle is not isolated the
/// host `require` serves as fallback for unregistered (ignored) names.
pub struct CodeEmitter {
    isolate: bool,
    lua_version: String,
}

impl CodeEmitter {
    pub fn new(isolate: bool, lua_version: &str) -> Self {
        Self {
            isolate,
            lua_version: lua_version.to_string(),
        }
    }

    /// Emit the complete bundle for the given modules.
    ///
    /// `modules` is expected in deterministic (dependency-first) order and
    /// must contain the entry; the entry is registered as `__root`, every
    /// other module under its original dotted name.
    pub fn emit_bundle(&self, modules: &[&ModuleNode], entry_name: &str) -> Result<String> {
        let entry = modules
            .iter()
            .find(|m| m.name == entry_name)
            .ok_or_else(|| anyhow!("Entry module '{}' missing from module set", entry_name))?;

        let mut output = String::new();
        writeln!(
            output,
            "-- Bundled by lupine v{} ({})",
            env!("CARGO_PKG_VERSION"),
            self.lua_version
        )?;
        output.push_str(&self.render_prelude());

        output.push_str(&self.render_module(ROOT_MODULE_NAME, entry)?);
        for module in modules.iter().filter(|m| m.name != entry_name) {
            output.push_str(&self.render_module(&module.name, module)?);
        }

        writeln!(output, "return __bundle_require(\"{}\")", ROOT_MODULE_NAME)?;

        Ok(output)
    }

    fn render_module(&self, registered_name: &str, module: &ModuleNode) -> Result<String> {
        let source = fs::read_to_string(&module.path)
            .with_context(|| format!("Failed to read module file: {:?}", module.path))?;
        Ok(self.render_register(registered_name, &normalize_line_endings(source)))
    }

    /// Wrap one module body in its registration block. The body executes in
    /// its own function scope, identified by the registered module name.
    pub fn render_register(&self, name: &str, body: &str) -> String {
        let mut block = format!(
            "__bundle_register(\"{}\", function(require, _LOADED, __bundle_register, __bundle_modules)\n",
            name
        );
        block.push_str(body);
        if !body.ends_with('\n') {
            block.push('\n');
        }
        block.push_str("end)\n");
        block
    }

    /// The require shim. `superRequire` is the host `require` unless the
    /// bundle is isolated, in which case unregistered names are an error.
    fn render_prelude(&self) -> String {
        let super_require = if self.isolate { "nil" } else { "require" };
        format!(
            r#"local __bundle_require, __bundle_loaded, __bundle_register, __bundle_modules = (function(superRequire)
	local loadingPlaceholder = {{[{{}}] = true}}

	local register
	local modules = {{}}

	local require
	local loaded = {{}}

	register = function(name, body)
		if not modules[name] then
			modules[name] = body
		end
	end

	require = function(name)
		local loadedModule = loaded[name]

		if loadedModule then
			if loadedModule == loadingPlaceholder then
				return nil
			end
		else
			if not modules[name] then
				if not superRequire then
					local identifier = type(name) == 'string' and '"' .. name .. '"' or tostring(name)
					error('Tried to require ' .. identifier .. ', but no such module has been registered')
				else
					return superRequire(name)
				end
			end

			loaded[name] = loadingPlaceholder
			loadedModule = modules[name](require, loaded, register, modules)
			loaded[name] = loadedModule
		end

		return loadedModule
	end

	return require, loaded, register, modules
end)({})
"#,
            super_require
        )
    }
}
