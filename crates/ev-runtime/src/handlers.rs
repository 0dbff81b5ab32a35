//! Built-in command handlers.

use std::rc::Rc;

use ev_core::{command_ids, Command, CommandKind, WaitKind};

use crate::engine::Interpreter;
use crate::host::{AnimationRequest, InputRequest, MessageRequest};
use crate::registry::CommandRegistry;

pub(crate) fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(command_ids::COMMENT, |_: &mut Interpreter, _: &Command| {});
    registry.register(command_ids::LABEL, label);
    registry.register(command_ids::JUMP_TO_LABEL, jump_to_label);
    registry.register(command_ids::LOOP, |interpreter: &mut Interpreter, _: &Command| {
        interpreter.command_loop()
    });
    registry.register(command_ids::BREAK_LOOP, |interpreter: &mut Interpreter, _: &Command| {
        interpreter.command_break_loop()
    });
    registry.register(
        command_ids::CONTINUE_LOOP,
        |interpreter: &mut Interpreter, _: &Command| interpreter.command_continue_loop(),
    );
    registry.register(command_ids::CONDITION, condition);
    registry.register(
        command_ids::CONDITION_ELSE,
        |interpreter: &mut Interpreter, _: &Command| interpreter.command_condition_else(),
    );
    registry.register(command_ids::CONDITION_ELSE_IF, condition_else_if);
    registry.register(command_ids::WAIT, wait);
    registry.register(command_ids::CHANGE_VARIABLE, change_variable);
    registry.register(command_ids::SCRIPT, script);
    registry.register(command_ids::SHOW_MESSAGE, show_message);
    registry.register(command_ids::MESSAGE_SETTINGS, message_settings);
    registry.register(command_ids::INPUT_NUMBER, input_number);
    registry.register(command_ids::INPUT_TEXT, input_text);
    registry.register(command_ids::SHOW_CHOICES, show_choices);
    registry.register(command_ids::OBJECT_EFFECT, object_effect);
    registry.register(command_ids::CALL_COMMON_EVENT, call_common_event);
    registry.register(command_ids::CALL_SCENE, call_scene);
    registry.register(command_ids::EXIT_EVENT, |interpreter: &mut Interpreter, _: &Command| {
        interpreter.exit_event()
    });
}

// A known id whose params failed to decode arrives as `Unknown` and is ignored
// by the typed handlers below.

fn label(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::Label(params) = &command.kind {
        interpreter.record_label(&params.name);
    }
}

fn jump_to_label(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::JumpToLabel(params) = &command.kind {
        interpreter.jump_to_label(&params.name);
    }
}

fn condition(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::Condition(params) = &command.kind {
        interpreter.command_condition(params);
    }
}

fn condition_else_if(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::ConditionElseIf(params) = &command.kind {
        interpreter.command_condition_else_if(params);
    }
}

fn wait(interpreter: &mut Interpreter, command: &Command) {
    let CommandKind::Wait(params) = &command.kind else {
        return;
    };
    let frames = interpreter.duration_value_of(params.duration);
    if frames > 0 && !interpreter.is_instant_skip() {
        interpreter.wait(frames, None);
    }
}

fn change_variable(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::ChangeVariable(params) = &command.kind {
        interpreter.change_variable(params);
    }
}

fn script(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::Script(params) = &command.kind {
        interpreter.run_script(&params.source);
    }
}

/// Retries while another context owns the message box. Under instant skip the
/// message is shown and dismissed without waiting.
fn show_message(interpreter: &mut Interpreter, command: &Command) {
    let CommandKind::ShowMessage(params) = &command.kind else {
        return;
    };
    let env = Rc::clone(interpreter.env());
    if env.host().borrow().is_message_busy(interpreter.context()) {
        interpreter.wait_for_message();
        return;
    }

    let settings = interpreter.settings().borrow().clone();
    let request = MessageRequest {
        context: interpreter.context().clone(),
        character: params.character.clone(),
        text: interpreter.render_text(&params.text),
        settings: settings.clone(),
    };
    env.host().borrow_mut().show_message(request);

    if interpreter.is_instant_skip() {
        if settings.auto_erase {
            env.host().borrow_mut().close_message(interpreter.context());
        }
    } else if settings.wait_at_end {
        interpreter.begin_external_wait(WaitKind::Message);
    }
}

fn message_settings(interpreter: &mut Interpreter, command: &Command) {
    let CommandKind::MessageSettings(params) = &command.kind else {
        return;
    };
    let mut settings = interpreter.settings().borrow_mut();
    if let Some(auto_erase) = params.auto_erase {
        settings.auto_erase = auto_erase;
    }
    if let Some(backlog) = params.backlog {
        settings.backlog = backlog;
    }
    if let Some(wait_at_end) = params.wait_at_end {
        settings.wait_at_end = wait_at_end;
    }
}

fn input_number(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::InputNumber(params) = &command.kind {
        request_input(
            interpreter,
            InputRequest::Number {
                digits: params.digits,
            },
            WaitKind::InputNumber,
        );
    }
}

fn input_text(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::InputText(params) = &command.kind {
        request_input(
            interpreter,
            InputRequest::Text {
                letters: params.letters,
            },
            WaitKind::InputText,
        );
    }
}

fn show_choices(interpreter: &mut Interpreter, command: &Command) {
    let CommandKind::ShowChoices(params) = &command.kind else {
        return;
    };
    let request = InputRequest::Choice {
        prompt: params
            .prompt
            .as_deref()
            .map(|prompt| interpreter.render_text(prompt)),
        choices: params
            .choices
            .iter()
            .map(|choice| interpreter.render_text(choice))
            .collect(),
    };
    request_input(interpreter, request, WaitKind::Choice);
}

fn request_input(interpreter: &mut Interpreter, request: InputRequest, kind: WaitKind) {
    let env = Rc::clone(interpreter.env());
    env.host()
        .borrow_mut()
        .request_input(interpreter.context(), request);
    interpreter.begin_external_wait(kind);
}

fn object_effect(interpreter: &mut Interpreter, command: &Command) {
    let CommandKind::ObjectEffect(params) = &command.kind else {
        return;
    };
    let frames = interpreter.duration_value_of(params.timing.duration);
    interpreter.env().host().borrow_mut().animate(AnimationRequest {
        target: params.target.clone(),
        effect: params.effect.clone(),
        easing: params.easing.clone(),
        frames,
    });
    interpreter.wait_for_completion(&params.timing);
}

fn call_common_event(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::CallCommonEvent(params) = &command.kind {
        interpreter.call_common_event(
            &params.common_event_id,
            params.parameters.clone(),
            params.resume_waiting,
        );
    }
}

fn call_scene(interpreter: &mut Interpreter, command: &Command) {
    if let CommandKind::CallScene(params) = &command.kind {
        interpreter.call_scene(&params.scene_uid);
    }
}
