//! Library assembly and emission.
//!
//! A written library is a directory holding `include/<name>.h`, one
//! `src/<function>.cpp` per function and `<name>.manifest.json`. The manifest
//! lists every generated file, which is what `clean_existing_sources` uses to
//! remove a previous emission without touching anything else.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use wilco_core::{
    from_json_slice, stable_hash_string, to_canonical_json_pretty, ErrorInfo, SchemaVersion,
    WilcoError,
};
use wilco_expr::{AbbreviationTable, Expr, LoopFunction, Node, Symbol, SymbolKind, PI_NAME};

use crate::cpp::{codegen_error, loop_runtime_name, render, validate_identifier};

fn io_error(path: &Path, err: std::io::Error) -> WilcoError {
    WilcoError::Codegen(
        ErrorInfo::new("io", err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn format_error(path: &str) -> WilcoError {
    WilcoError::Codegen(
        ErrorInfo::new("format", "generated text could not be formatted").with_context("path", path),
    )
}

/// One emitted function: a body plus the abbreviations it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFunction {
    /// C++ function name.
    pub name: String,
    /// Returned expression.
    pub body: Expr,
    /// Abbreviations declared as locals, in definition order.
    pub abbreviations: Vec<(Symbol, Expr)>,
}

impl LibraryFunction {
    fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.abbreviations
            .iter()
            .map(|(_, body)| body)
            .chain(std::iter::once(&self.body))
    }
}

/// Generated file with its content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Path relative to the library directory.
    pub path: String,
    /// Hex SHA-256 of the file content.
    pub sha256: String,
}

/// Description of a written library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryManifest {
    /// Manifest schema.
    pub schema_version: SchemaVersion,
    /// Library name.
    pub library: String,
    /// Header declaring the parameter struct and every function.
    pub header: GeneratedFile,
    /// One source per function, in insertion order.
    pub sources: Vec<GeneratedFile>,
    /// Function names in insertion order.
    pub functions: Vec<String>,
    /// Fields of the parameter struct, sorted.
    pub parameters: Vec<String>,
    /// Runtime loop functions the library links against.
    pub loop_functions: Vec<String>,
    /// Canonical hash of every other field.
    pub hash: String,
}

impl LibraryManifest {
    /// Generated paths, header first.
    pub fn files(&self) -> impl Iterator<Item = &GeneratedFile> {
        std::iter::once(&self.header).chain(self.sources.iter())
    }
}

/// Named collection of functions emitted as one C++ library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    name: String,
    functions: Vec<LibraryFunction>,
}

impl Library {
    /// Empty library; `name` must be a valid identifier.
    pub fn new(name: &str) -> Result<Self, WilcoError> {
        validate_identifier(name)?;
        Ok(Self {
            name: name.to_string(),
            functions: Vec::new(),
        })
    }

    /// Library name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Functions in insertion order.
    pub fn functions(&self) -> &[LibraryFunction] {
        &self.functions
    }

    fn manifest_name(&self) -> String {
        format!("{}.manifest.json", self.name)
    }

    fn header_path(&self) -> String {
        format!("include/{}.h", self.name)
    }

    fn source_path(&self, function: &str) -> String {
        format!("src/{}.cpp", function)
    }

    /// Adds a function whose expression carries no abbreviation.
    pub fn add_function(&mut self, name: &str, expr: &Expr) -> Result<&mut Self, WilcoError> {
        self.push(name, expr, Vec::new())
    }

    /// Adds a function, declaring the abbreviations of `table` it references.
    pub fn add_function_with(
        &mut self,
        name: &str,
        expr: &Expr,
        table: &AbbreviationTable,
    ) -> Result<&mut Self, WilcoError> {
        self.push(name, expr, table.dependencies(expr))
    }

    fn push(
        &mut self,
        name: &str,
        expr: &Expr,
        abbreviations: Vec<(Symbol, Expr)>,
    ) -> Result<&mut Self, WilcoError> {
        validate_identifier(name)?;
        if name == self.name || self.functions.iter().any(|f| f.name == name) {
            return Err(WilcoError::Codegen(
                ErrorInfo::new("duplicate-function", "function names must be unique")
                    .with_context("library", self.name.clone())
                    .with_context("function", name),
            ));
        }
        let function = LibraryFunction {
            name: name.to_string(),
            body: expr.clone(),
            abbreviations,
        };
        let declared: BTreeSet<&str> = function
            .abbreviations
            .iter()
            .map(|(symbol, _)| symbol.name.as_str())
            .collect();
        for expr in function.expressions() {
            for symbol in expr.free_symbols() {
                if symbol.is_abbreviation() && !declared.contains(symbol.name.as_str()) {
                    return Err(WilcoError::Codegen(
                        ErrorInfo::new("unresolved-abbreviation", "abbreviation has no definition")
                            .with_context("function", name)
                            .with_context("symbol", symbol.name)
                            .with_hint("expand abbreviations or pass the table"),
                    ));
                }
            }
            render(expr)?;
        }
        debug!(library = %self.name, function = name, "added function");
        self.functions.push(function);
        Ok(self)
    }

    /// Sorted parameter and kinematic names read by the functions.
    pub fn parameters(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .functions
            .iter()
            .flat_map(LibraryFunction::expressions)
            .flat_map(|expr| expr.free_symbols())
            .filter(|symbol| matches!(symbol.kind, SymbolKind::Parameter | SymbolKind::Kinematic))
            .filter(|symbol| symbol.name != PI_NAME)
            .map(|symbol| symbol.name)
            .collect();
        names.into_iter().collect()
    }

    /// Loop functions called anywhere in the library.
    pub fn loop_functions(&self) -> BTreeSet<LoopFunction> {
        self.functions
            .iter()
            .flat_map(LibraryFunction::expressions)
            .flat_map(|expr| expr.loop_functions())
            .filter_map(|call| match call.node() {
                Node::Loop(function, _) => Some(*function),
                _ => None,
            })
            .collect()
    }

    /// Header text.
    pub fn header(&self) -> Result<String, WilcoError> {
        let mut out = String::new();
        self.write_header(&mut out).map_err(|_| format_error(&self.header_path()))?;
        Ok(out)
    }

    fn write_header(&self, out: &mut String) -> fmt::Result {
        let guard = format!("{}_H", self.name.to_uppercase());
        writeln!(out, "// Generated by wilco. Do not edit.")?;
        writeln!(out, "#ifndef {}\n#define {}\n", guard, guard)?;
        writeln!(out, "struct {}_params {{", self.name)?;
        for parameter in self.parameters() {
            writeln!(out, "    double {};", parameter)?;
        }
        writeln!(out, "}};\n")?;
        let loop_functions = self.loop_functions();
        for function in &loop_functions {
            let args = vec!["double"; function.arity()].join(", ");
            writeln!(out, "extern \"C\" double {}({});", loop_runtime_name(*function), args)?;
        }
        if !loop_functions.is_empty() {
            writeln!(out)?;
        }
        for function in &self.functions {
            writeln!(out, "double {}(const {}_params& params);", function.name, self.name)?;
        }
        writeln!(out, "\n#endif")
    }

    /// Source text of `function`.
    pub fn source(&self, function: &LibraryFunction) -> Result<String, WilcoError> {
        let mut constants = Vec::with_capacity(function.abbreviations.len());
        for (symbol, body) in &function.abbreviations {
            constants.push((symbol.name.as_str(), render(body)?));
        }
        let body = render(&function.body)?;
        let mut out = String::new();
        self.write_source(&mut out, &function.name, &constants, &body)
            .map_err(|_| format_error(&self.source_path(&function.name)))?;
        Ok(out)
    }

    fn write_source(
        &self,
        out: &mut String,
        name: &str,
        constants: &[(&str, String)],
        body: &str,
    ) -> fmt::Result {
        writeln!(out, "// Generated by wilco. Do not edit.")?;
        writeln!(out, "#include <cmath>")?;
        writeln!(out, "#include \"../{}\"\n", self.header_path())?;
        writeln!(out, "double {}(const {}_params& params)\n{{", name, self.name)?;
        writeln!(out, "    (void)params;")?;
        for (symbol, value) in constants {
            writeln!(out, "    const double {} = {};", symbol, value)?;
        }
        writeln!(out, "    return {};\n}}", body)
    }

    /// Removes the files listed by a previous manifest of this library in
    /// `dir`, then the manifest itself. Returns the number of removed files.
    pub fn clean_existing_sources(&self, dir: &Path) -> Result<usize, WilcoError> {
        let manifest_path = dir.join(self.manifest_name());
        if !manifest_path.exists() {
            return Ok(0);
        }
        let bytes = fs::read(&manifest_path).map_err(|err| io_error(&manifest_path, err))?;
        let manifest: LibraryManifest = from_json_slice(&bytes)?;
        let mut removed = 0;
        for file in manifest.files() {
            let relative = Path::new(&file.path);
            if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
                return Err(WilcoError::Codegen(
                    ErrorInfo::new("manifest-path", "manifest lists a path outside the library")
                        .with_context("path", file.path.clone()),
                ));
            }
            let path = dir.join(relative);
            if path.exists() {
                fs::remove_file(&path).map_err(|err| io_error(&path, err))?;
                removed += 1;
            }
        }
        fs::remove_file(&manifest_path).map_err(|err| io_error(&manifest_path, err))?;
        info!(library = %self.name, removed, "cleaned previous sources");
        Ok(removed + 1)
    }

    /// Writes header, sources and manifest under `dir`.
    pub fn write(&self, dir: &Path) -> Result<LibraryManifest, WilcoError> {
        if self.functions.is_empty() {
            return Err(codegen_error("empty-library", "a library needs at least one function"));
        }
        for sub in ["include", "src"] {
            let path = dir.join(sub);
            fs::create_dir_all(&path).map_err(|err| io_error(&path, err))?;
        }
        let header = write_file(dir, &self.header_path(), &self.header()?)?;
        let mut sources = Vec::with_capacity(self.functions.len());
        for function in &self.functions {
            let text = self.source(function)?;
            sources.push(write_file(dir, &self.source_path(&function.name), &text)?);
        }
        let mut manifest = LibraryManifest {
            schema_version: SchemaVersion::default(),
            library: self.name.clone(),
            header,
            sources,
            functions: self.functions.iter().map(|f| f.name.clone()).collect(),
            parameters: self.parameters(),
            loop_functions: self.loop_functions().into_iter().map(loop_runtime_name).collect(),
            hash: String::new(),
        };
        manifest.hash = stable_hash_string(&manifest)?;
        let manifest_path = dir.join(self.manifest_name());
        let text = to_canonical_json_pretty(&manifest)?;
        fs::write(&manifest_path, text).map_err(|err| io_error(&manifest_path, err))?;
        info!(
            library = %self.name,
            functions = manifest.functions.len(),
            hash = %manifest.hash,
            "wrote library"
        );
        Ok(manifest)
    }
}

fn write_file(dir: &Path, relative: &str, text: &str) -> Result<GeneratedFile, WilcoError> {
    let path = dir.join(relative);
    fs::write(&path, text).map_err(|err| io_error(&path, err))?;
    Ok(GeneratedFile {
        path: relative.to_string(),
        sha256: format!("{:x}", Sha256::digest(text.as_bytes())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_library_named_functions_are_rejected() {
        let mut lib = Library::new("demolib").expect("lib");
        lib.add_function("f", &Expr::param("e")).expect("first");
        assert_eq!(
            lib.add_function("f", &Expr::param("e")).expect_err("dup").code(),
            "duplicate-function"
        );
        assert_eq!(
            lib.add_function("demolib", &Expr::one()).expect_err("clash").code(),
            "duplicate-function"
        );
    }

    #[test]
    fn abbreviations_need_a_table() {
        let mut table = AbbreviationTable::new();
        let symbol = table
            .abbreviate(Expr::mul([Expr::param("e"), Expr::param("m_mu")]))
            .expect("abbreviate");
        let expr = Expr::add([symbol, Expr::one()]);
        let mut lib = Library::new("demolib").expect("lib");
        assert_eq!(
            lib.add_function("g", &expr).expect_err("unresolved").code(),
            "unresolved-abbreviation"
        );
        lib.add_function_with("g", &expr, &table).expect("with table");
        let source = lib.source(&lib.functions()[0]).expect("source");
        assert!(source.contains("const double Ab_0 = "));
        assert_eq!(lib.parameters(), vec!["e".to_string(), "m_mu".to_string()]);
    }

    #[test]
    fn header_lists_runtime_then_functions() {
        let mut lib = Library::new("demolib").expect("lib");
        let b0 = Expr::loop_fn(
            LoopFunction::B0,
            vec![Expr::param("p_sq"), Expr::zero(), Expr::param("m_sq")],
        );
        lib.add_function("loop_part", &b0).expect("loop");
        let header = lib.header().expect("header");
        let runtime = header.find("extern \"C\" double wilco_B0(double, double, double);").expect("runtime");
        let declaration = header.find("double loop_part(const demolib_params& params);").expect("declaration");
        assert!(runtime < declaration);
        assert!(header.contains("    double m_sq;\n    double p_sq;\n"));
        assert!(header.trim_end().ends_with("#endif"));
    }
}
