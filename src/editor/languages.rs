//! Fixed language registry: each supported language tag maps to a display
//! version and the starter template the document resets to on selection.
//! Pure configuration data — only JavaScript is executable in the sandbox.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LanguageSpec {
    pub tag: &'static str,
    pub version: &'static str,
    pub template: &'static str,
    /// Whether the sandbox can run this language. Everything except
    /// JavaScript is display/edit only.
    pub executable: bool,
}

pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        tag: "javascript",
        version: "18.15.0",
        template: "function greet(name) {\n\tconsole.log(\"Hello, \" + name + \"!\");\n}\n\ngreet(\"Alex\");\n",
        executable: true,
    },
    LanguageSpec {
        tag: "typescript",
        version: "5.0.3",
        template: "type Params = {\n\tname: string;\n};\n\nfunction greet(data: Params) {\n\tconsole.log(\"Hello, \" + data.name + \"!\");\n}\n\ngreet({ name: \"Alex\" });\n",
        executable: false,
    },
    LanguageSpec {
        tag: "python",
        version: "3.10.0",
        template: "def greet(name):\n\tprint(\"Hello, \" + name + \"!\")\n\ngreet(\"Alex\")\n",
        executable: false,
    },
    LanguageSpec {
        tag: "java",
        version: "15.0.2",
        template: "public class HelloWorld {\n\tpublic static void main(String[] args) {\n\t\tSystem.out.println(\"Hello World\");\n\t}\n}\n",
        executable: false,
    },
    LanguageSpec {
        tag: "csharp",
        version: "6.12.0",
        template: "using System;\n\nnamespace HelloWorld\n{\n\tclass Hello {\n\t\tstatic void Main(string[] args) {\n\t\t\tConsole.WriteLine(\"Hello World in C#\");\n\t\t}\n\t}\n}\n",
        executable: false,
    },
    LanguageSpec {
        tag: "php",
        version: "8.2.3",
        template: "<?php\n\n$name = 'Alex';\necho $name;\n",
        executable: false,
    },
];

/// Look up a language by its tag.
pub fn find(tag: &str) -> Option<&'static LanguageSpec> {
    LANGUAGES.iter().find(|spec| spec.tag == tag)
}
