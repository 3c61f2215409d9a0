//! Fixed messages shown during installation.

use std::path::Path;

use crate::output::Output;

pub fn introduction(out: &dyn Output) {
    out.println("Welcome! This tool downloads the Stable Diffusion weight files and the");
    out.println("other large models needed for text to image generation. You may interrupt");
    out.println("it at any point with Ctrl-C and run it again later: partial downloads resume");
    out.println("where they stopped.");
    out.newline();
}

pub fn initializing_root(out: &dyn Output, root: &Path, init_file: Option<&Path>) {
    out.header("Initializing root directory");
    out.println(&format!(
        "Creating {} to hold models, configuration files and outputs.",
        root.display()
    ));
    match init_file {
        Some(init) => out.println(&format!(
            "If you move this directory, update the --root line in {} or set INVOKEAI_ROOT.",
            init.display()
        )),
        None => out.println("If you move this directory, set INVOKEAI_ROOT to its new location."),
    }
    out.newline();
}

pub fn download_options(out: &dyn Output) {
    out.println("Weight files can be installed by hand, as described at:");
    out.newline();
    out.indented("https://github.com/invoke-ai/InvokeAI/blob/main/docs/installation/INSTALLING_MODELS.md");
    out.newline();
    out.println("or downloaded now. Choose the recommended set (about 10 GB), pick your own,");
    out.println("or skip this step.");
    out.newline();
}

pub fn customize_intro(out: &dyn Output) {
    out.newline();
    out.println("Choose the weight files to download. You can review and change the list");
    out.println("before anything is downloaded.");
    out.newline();
}

pub fn license(out: &dyn Output) {
    out.header("License agreement for weight files");
    out.println("The Stable Diffusion weights are published on Hugging Face under the");
    out.println("CreativeML Responsible AI license. Before downloading you need to:");
    out.newline();
    out.println("1. Create a Hugging Face account and verify your email address:");
    out.indented("https://huggingface.co/join");
    out.println("2. Log in:");
    out.indented("https://huggingface.co/login");
    out.println("3. Accept the license terms on both of these pages:");
    out.indented("https://huggingface.co/runwayml/stable-diffusion-v1-5");
    out.indented("https://huggingface.co/runwayml/stable-diffusion-inpainting");
    out.newline();
}

pub fn token_instructions(out: &dyn Output) {
    out.newline();
    out.println("4. Create an access token so downloads can be authorized. Open");
    out.indented("https://huggingface.co/settings/tokens");
    out.println("   click \"New token\", give it any name with the \"read\" role, and paste it below.");
    out.newline();
}

pub fn download_failed(out: &dyn Output) {
    out.newline();
    out.warn("There were errors downloading one or more files.");
    out.println("Please double-check your license agreements and your access token.");
    out.println("The cached token has been discarded.");
}

pub fn postscript(out: &dyn Output) {
    out.newline();
    out.header("Model installation successful");
    out.println("You're all set! Launch the image generator with one of:");
    out.indented("Web version:          python scripts/invoke.py --web  (http://localhost:9090)");
    out.indented("Command-line version: python scripts/invoke.py");
    out.newline();
    out.println("If you used one of the automated installers, run invoke.sh (Linux/Mac)");
    out.println("or invoke.bat (Windows) instead.");
    out.newline();
    out.println("Have fun!");
}
